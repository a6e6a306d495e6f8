use gearcart_core::CartEntry;

/// The cart as the view layer sees it.
///
/// Derived values (totals, shipping) are deliberately absent; they are
/// computed from `items` on every read by [`CartStore`](crate::CartStore).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    pub(crate) items: Vec<CartEntry>,
    pub(crate) loading: bool,
    pub(crate) error: Option<String>,
}

impl CartState {
    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartEntry] {
        &self.items
    }

    /// `true` while a remote operation is in flight.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Message from the last failed operation, cleared by the next success.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Raises a `loading` flag for as long as it lives. Dropping it, including
/// when the owning future is cancelled, lowers the flag again.
pub(crate) struct LoadingFlag<'a>(&'a mut bool);

impl<'a> LoadingFlag<'a> {
    pub(crate) fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}
