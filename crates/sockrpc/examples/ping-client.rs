//! Calls `ping` on the ping-server demo a few times over one connection.

use sockrpc::rpc::{ParamList, RpcClient};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut answer = ParamList::new();
    {
        let mut client = RpcClient::tcp("127.0.0.1", 11120);
        client.set_answer(&mut answer);
        for _ in 0..3 {
            client.call_method("ping")?;
            eprintln!("answer: {}", client.answer());
        }
    }
    eprintln!("last answer kept by caller: {answer}");
    Ok(())
}
