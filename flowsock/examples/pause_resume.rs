//! Flow control walkthrough: pause a consumer, pull one message by hand,
//! resume, and watch a producer hit the high water mark.
//!
//! ## How to Run This Demo
//!
//! ```sh
//! RUST_LOG=flowsock_core=debug cargo run --example pause_resume
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use flowsock::prelude::*;

#[compio::main]
async fn main() -> flowsock::Result<()> {
    flowsock::dev_tracing::init_tracing();
    println!("\n=== Pause / Resume Demo ===\n");

    let pull = flowsock::socket(SocketType::Pull)?;
    let push = flowsock::socket(SocketType::Push)?;
    pull.set_option(SocketOption::RcvHwm, 2)?;
    push.set_option(SocketOption::SndHwm, 2)?;

    let delivered = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&delivered);
    pull.on_message(move |_, msg| {
        let text = msg.to_strings().join(" | ");
        println!("   [PULL] message event: {text}");
        log.borrow_mut().push(text);
    });

    pull.bind("inproc://demo")?;
    push.connect("inproc://demo")?;

    println!("1. Pausing the consumer and sending 6 jobs...");
    pull.pause();
    for n in 1..=6 {
        push.send(["job", n.to_string().as_str()])?;
    }
    println!(
        "   ✓ {} jobs still queued at the producer (high water mark reached)\n",
        push.queued_batches()
    );

    println!("2. Readiness edges while paused are recorded, not delivered...");
    pull.process_ready()?;
    println!("   ✓ {} events delivered\n", delivered.borrow().len());

    println!("3. Manual read while paused...");
    if let Some(msg) = pull.read()? {
        println!("   [PULL] read(): {}", msg.to_strings().join(" | "));
    }

    println!("\n4. Resuming; the producer catches up as room frees...");
    pull.resume()?;
    while push.queued_batches() > 0 {
        push.ready().await?;
        pull.process_ready()?;
    }

    println!(
        "\n✅ {} events after resume, producer queue empty",
        delivered.borrow().len()
    );
    Ok(())
}
