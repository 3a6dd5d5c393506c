use guestbook_core::AccountId;

/// Calling account for a request, established by the caller middleware.
///
/// Immutable and present on every `/call` route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    account_id: AccountId,
}

impl CallerContext {
    pub fn new(account_id: AccountId) -> Self {
        Self { account_id }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }
}
