use sockrpc_params::ParamList;

use crate::codes;

/// Business logic of an [`RpcServer`](crate::RpcServer).
///
/// Any `FnMut(&ParamList, &mut ParamList)` closure is a handler that accepts
/// every peer.
pub trait RpcHandler {
    /// Called before a connection is read; `false` closes it unread.
    fn accept_peer(&mut self, _remote: &str) -> bool {
        true
    }

    /// Fill `answer` for the request in `arguments`.
    ///
    /// The answer should carry `result.code`; `"ok"` means success.
    fn handle(&mut self, arguments: &ParamList, answer: &mut ParamList);
}

impl<F> RpcHandler for F
where
    F: FnMut(&ParamList, &mut ParamList),
{
    fn handle(&mut self, arguments: &ParamList, answer: &mut ParamList) {
        self(arguments, answer)
    }
}

/// Answers every call with `result.code = "ok"` and a greeting.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl RpcHandler for DefaultHandler {
    fn handle(&mut self, _arguments: &ParamList, answer: &mut ParamList) {
        // A fresh answer list has no scalar in the way, so these cannot fail.
        let _ = answer.set_string(codes::RESULT_CODE, codes::OK);
        let _ = answer.set_string("Answer", "Hello world!");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_handler_answers_ok() {
        let mut answer = ParamList::new();
        DefaultHandler.handle(&ParamList::new(), &mut answer);
        assert_eq!(answer.get_string("result.code"), "ok");
        assert_eq!(answer.get_string("Answer"), "Hello world!");
    }

    #[test]
    fn closures_are_handlers() {
        let mut calls = 0;
        let mut handler = |_: &ParamList, answer: &mut ParamList| {
            calls += 1;
            answer.set_int("calls", 1).expect("set should succeed");
        };
        assert!(handler.accept_peer("127.0.0.1"));

        let mut answer = ParamList::new();
        handler.handle(&ParamList::new(), &mut answer);
        drop(handler);
        assert_eq!(calls, 1);
        assert_eq!(answer.get_int("calls"), Some(1));
    }
}
