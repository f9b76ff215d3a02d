//! Send-side drain behaviour against a scripted transport

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{record_messages, scripted, strings};
use flowsock_core::prelude::*;

#[test]
fn test_frames_leave_in_send_order() {
    let (socket, script) = scripted(SocketType::Push);

    socket.send("a").unwrap();
    socket.send(["b", "c"]).unwrap();
    socket.send("d").unwrap();

    assert_eq!(script.sent_strings(), strings(&["a", "b", "c", "d"]));
    assert_eq!(script.sent_flags(), vec![false, true, false, false]);
    assert_eq!(socket.queued_batches(), 0);
    assert!(!script.write_interest());
}

#[test]
fn test_open_message_is_held_until_closed() {
    let (socket, script) = scripted(SocketType::Pub);

    socket.send_with(["tobi", "loki"], SendFlags::SNDMORE).unwrap();
    socket.send_with(["jane", "luna"], SendFlags::SNDMORE).unwrap();
    assert!(script.sent_strings().is_empty());
    assert_eq!(socket.queued_batches(), 1);
    assert_eq!(socket.pending_frames(), 4);

    socket.send("manny").unwrap();
    assert_eq!(
        script.sent_strings(),
        strings(&["tobi", "loki", "jane", "luna", "manny"])
    );
    assert_eq!(script.sent_flags(), vec![true, true, true, true, false]);
}

#[test]
fn test_would_block_resumes_from_first_unsent_frame() {
    let (socket, script) = scripted(SocketType::Dealer);
    script.set_budget(Some(1));

    socket.send(["a", "b", "c"]).unwrap();
    assert_eq!(script.sent_strings(), strings(&["a"]));
    assert_eq!(socket.queued_batches(), 1);
    assert_eq!(socket.pending_frames(), 2);
    assert!(script.write_interest());

    script.grant(10);
    assert_eq!(socket.process_ready().unwrap(), 1);

    assert_eq!(script.sent_strings(), strings(&["a", "b", "c"]));
    assert_eq!(script.sent_flags(), vec![true, true, false]);
    assert_eq!(socket.queued_batches(), 0);
    assert!(!script.write_interest());
}

#[test]
fn test_later_sends_wait_behind_blocked_message() {
    let (socket, script) = scripted(SocketType::Push);
    script.set_budget(Some(0));

    socket.send("m1").unwrap();
    socket.send("m2").unwrap();
    socket.send(["m3", "m3b"]).unwrap();
    assert!(script.sent_strings().is_empty());
    assert_eq!(socket.queued_batches(), 3);

    script.grant(2);
    socket.process_ready().unwrap();
    assert_eq!(script.sent_strings(), strings(&["m1", "m2"]));

    script.grant(10);
    socket.process_ready().unwrap();
    assert_eq!(script.sent_strings(), strings(&["m1", "m2", "m3", "m3b"]));
}

#[test]
fn test_callback_receives_send_failure() {
    let (socket, script) = scripted(SocketType::Router);
    let errors = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&errors);
    socket.on_error(move |_, err| sink.borrow_mut().push(err.to_string()));

    script.fail_next_sends(1);
    let log = Rc::clone(&seen);
    socket
        .send_with_callback(["12384982398293", "hello"], SendFlags::NONE, move |_, res| {
            log.borrow_mut().push(res.map_err(ToString::to_string));
        })
        .unwrap();

    assert_eq!(*seen.borrow(), vec![Err("No route to host".to_string())]);
    assert!(errors.borrow().is_empty());
    assert!(script.sent_strings().is_empty());
}

#[test]
fn test_failure_without_callback_is_returned() {
    let (socket, script) = scripted(SocketType::Router);
    script.fail_next_sends(1);

    let err = socket.send(["12384982398293", "hello"]).unwrap_err();
    assert!(matches!(err, Error::Unroutable { .. }));

    // the socket keeps working
    socket.send(["peer", "again"]).unwrap();
    assert_eq!(script.sent_strings(), strings(&["peer", "again"]));
}

#[test]
fn test_failure_without_callback_goes_to_error_handler() {
    let (socket, script) = scripted(SocketType::Router);
    let errors = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&errors);
    socket.on_error(move |_, _| *sink.borrow_mut() += 1);

    script.fail_next_sends(1);
    socket.send(["nobody", "hello"]).unwrap();
    assert_eq!(*errors.borrow(), 1);
}

#[test]
fn test_failure_stops_drain_but_keeps_queue() {
    let (socket, script) = scripted(SocketType::Push);
    script.set_budget(Some(0));

    let outcome = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&outcome);
    socket
        .send_with_callback("m1", SendFlags::NONE, move |_, res| {
            *slot.borrow_mut() = Some(res.is_ok());
        })
        .unwrap();
    socket.send("m2").unwrap();

    script.fail_next_sends(1);
    script.grant(10);
    socket.process_ready().unwrap();

    assert_eq!(*outcome.borrow(), Some(false));
    assert_eq!(socket.queued_batches(), 1);
    assert!(script.write_interest());

    socket.on_ready(Readiness::WRITABLE).unwrap();
    assert_eq!(script.sent_strings(), strings(&["m2"]));
}

#[test]
fn test_send_from_callback_is_picked_up_by_running_drain() {
    let (socket, script) = scripted(SocketType::Push);
    let calls = Rc::new(RefCell::new(0));

    let counter = Rc::clone(&calls);
    socket
        .send_with_callback("first", SendFlags::NONE, move |sock, res| {
            assert!(res.is_ok());
            *counter.borrow_mut() += 1;
            sock.send("second").unwrap();
        })
        .unwrap();

    assert_eq!(script.sent_strings(), strings(&["first", "second"]));
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(script.send_attempts(), 2);
}

#[test]
fn test_reentrant_edge_during_drain_is_noop() {
    let (socket, script) = scripted(SocketType::Push);

    socket
        .send_with_callback("first", SendFlags::NONE, |sock, _| {
            // a writable edge delivered while the drain is running
            sock.on_ready(Readiness::WRITABLE).unwrap();
        })
        .unwrap();
    socket.send("second").unwrap();

    assert_eq!(script.sent_strings(), strings(&["first", "second"]));
    assert_eq!(script.send_attempts(), 2);
}

#[test]
fn test_callbacks_run_in_fifo_order() {
    let (socket, script) = scripted(SocketType::Push);
    script.set_budget(Some(0));
    let order = Rc::new(RefCell::new(Vec::new()));

    for tag in ["one", "two", "three"] {
        let order = Rc::clone(&order);
        socket
            .send_with_callback(tag, SendFlags::NONE, move |_, _| order.borrow_mut().push(tag))
            .unwrap();
    }
    script.grant(10);
    socket.process_ready().unwrap();

    assert_eq!(*order.borrow(), vec!["one", "two", "three"]);
}

#[test]
fn test_pause_defers_sends() {
    let (socket, script) = scripted(SocketType::Push);
    socket.pause();

    socket.send("held").unwrap();
    assert!(script.sent_strings().is_empty());
    assert!(script.write_interest());

    socket.on_ready(Readiness::WRITABLE).unwrap();
    assert!(script.sent_strings().is_empty());

    socket.resume().unwrap();
    assert_eq!(script.sent_strings(), strings(&["held"]));
}

#[test]
fn test_receive_only_pattern_rejects_send() {
    let (socket, _script) = scripted(SocketType::Pull);
    let err = socket.send("nope").unwrap_err();
    assert!(matches!(
        err,
        Error::Unsupported {
            op: "send",
            socket_type: SocketType::Pull
        }
    ));
    assert!(err.is_misuse());
}

#[test]
fn test_empty_parts_send_nothing() {
    let (socket, script) = scripted(SocketType::Push);
    socket.send(Vec::<&str>::new()).unwrap();
    assert_eq!(socket.queued_batches(), 0);
    assert_eq!(script.send_attempts(), 0);
}

#[test]
fn test_close_abandons_queue_without_callbacks() {
    let (socket, script) = scripted(SocketType::Push);
    script.set_budget(Some(0));
    let called = Rc::new(RefCell::new(false));

    let flag = Rc::clone(&called);
    socket
        .send_with_callback("lost", SendFlags::NONE, move |_, _| *flag.borrow_mut() = true)
        .unwrap();
    assert_eq!(socket.queued_batches(), 1);

    socket.close();
    assert!(socket.is_closed());
    assert_eq!(socket.queued_batches(), 0);
    assert!(!*called.borrow());
    assert!(matches!(socket.send("late"), Err(Error::SocketClosed)));

    // closing again is harmless
    socket.close();
}

#[test]
fn test_numbers_are_sent_as_text() {
    let (socket, script) = scripted(SocketType::Push);
    socket.send([1_i64, 2, 3]).unwrap();
    socket.send(4.5_f64).unwrap();
    assert_eq!(script.sent_strings(), strings(&["1", "2", "3", "4.5"]));
}

#[test]
fn test_ready_resumes_blocked_batch() {
    let (socket, script) = scripted(SocketType::Dealer);
    script.set_budget(Some(0));
    socket.send(["head", "tail"]).unwrap();
    assert!(script.write_interest());

    script.grant(2);
    futures::executor::block_on(socket.ready()).unwrap();

    assert_eq!(script.sent_strings(), strings(&["head", "tail"]));
    assert_eq!(socket.queued_batches(), 0);
}

#[test]
fn test_resume_sends_even_when_catch_up_read_fails() {
    let (socket, script) = scripted(SocketType::Dealer);
    socket.pause();
    socket.send("queued").unwrap();
    script.fail_next_recv();
    script.queue_frames(&[("inbound", false)]);

    let err = socket.resume().unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(script.sent_strings(), strings(&["queued"]));
    assert_eq!(socket.queued_batches(), 0);

    // the read left behind comes back as an edge
    let log = record_messages(&socket);
    assert_eq!(socket.process_ready().unwrap(), 1);
    assert_eq!(*log.borrow(), vec![strings(&["inbound"])]);
}

#[test]
fn test_both_edge_sends_when_read_fails() {
    let (socket, script) = scripted(SocketType::Dealer);
    script.set_budget(Some(0));
    socket.send("out").unwrap();
    assert_eq!(socket.queued_batches(), 1);

    script.set_budget(Some(1));
    script.fail_next_recv();
    let err = socket.on_ready(Readiness::BOTH).unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(socket.edges_seen(), 1);
    assert_eq!(script.sent_strings(), strings(&["out"]));
    assert_eq!(socket.queued_batches(), 0);
}
