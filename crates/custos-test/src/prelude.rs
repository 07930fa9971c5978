//! Convenient imports for Custos tests.

pub use crate::fixtures::{
    at_offset, draft_for, failed_login_draft, login_draft, match_rule, pattern_rule, test_alert,
    test_notification, test_tenant, threshold_rule,
};
pub use crate::mocks::{CapturingSink, FlakySink, RejectingSink};
