use std::ops::{Deref, DerefMut};

use sockrpc_params::ParamList;

/// A request or answer held by an RPC client.
///
/// `Owned` lists are dropped with the client. `Borrowed` lists belong to the
/// caller, who reads them back once the client is gone.
#[derive(Debug)]
pub enum Container<'a> {
    Owned(ParamList),
    Borrowed(&'a mut ParamList),
}

impl Container<'_> {
    pub fn is_owned(&self) -> bool {
        matches!(self, Container::Owned(_))
    }
}

impl Default for Container<'_> {
    fn default() -> Self {
        Container::Owned(ParamList::new())
    }
}

impl Deref for Container<'_> {
    type Target = ParamList;

    fn deref(&self) -> &ParamList {
        match self {
            Container::Owned(list) => list,
            Container::Borrowed(list) => list,
        }
    }
}

impl DerefMut for Container<'_> {
    fn deref_mut(&mut self) -> &mut ParamList {
        match self {
            Container::Owned(list) => list,
            Container::Borrowed(list) => list,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrowed_writes_reach_the_caller() {
        let mut list = ParamList::new();
        {
            let mut container = Container::Borrowed(&mut list);
            assert!(!container.is_owned());
            container.set_string("method", "ping").expect("set should succeed");
        }
        assert_eq!(list.get_string("method"), "ping");
    }

    #[test]
    fn default_is_owned_and_empty() {
        let container = Container::default();
        assert!(container.is_owned());
        assert!(container.is_empty());
    }
}
