//! Revenue split validation and default allocation policy

pub mod config;
pub mod validator;

pub use config::{
    allocate, default_allocations, resolve_defaults, with_platform_fee, Allocation, Role,
    RoleRecipients, PLATFORM_RECIPIENT_ID,
};
pub use validator::{validate_shares, validate_splits, SplitError, SHARE_TOLERANCE};
