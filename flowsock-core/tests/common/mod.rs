//! Scripted in-memory transport for driving the engine from tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use bytes::Bytes;
use flowsock_core::prelude::*;

#[derive(Default)]
pub struct Script {
    pub sent: Vec<(Bytes, bool)>,
    pub send_attempts: usize,
    /// Frames accepted before answering `WouldBlock`; `None` is unlimited.
    pub budget: Option<usize>,
    /// Number of upcoming sends that fail hard.
    pub fail_sends: usize,
    pub fail_recv: usize,
    pub inbound: VecDeque<(Bytes, bool)>,
    pub last_more: bool,
    pub write_interest: bool,
    pub bound: Vec<String>,
    pub connected: Vec<String>,
    pub options: SocketOptions,
    pub closed: bool,
    notifier: Option<ReadyNotifier>,
}

/// Test-side handle to the script shared with the transport.
#[derive(Clone)]
pub struct ScriptHandle(pub Rc<RefCell<Script>>);

impl ScriptHandle {
    pub fn set_budget(&self, budget: Option<usize>) {
        self.0.borrow_mut().budget = budget;
    }

    /// Allow `frames` more frames and raise a writable edge.
    pub fn grant(&self, frames: usize) {
        let notifier = {
            let mut script = self.0.borrow_mut();
            script.budget = Some(frames);
            script.notifier.clone()
        };
        if let Some(n) = notifier {
            n.notify(Readiness::WRITABLE);
        }
    }

    pub fn fail_next_sends(&self, count: usize) {
        self.0.borrow_mut().fail_sends = count;
    }

    pub fn fail_next_recv(&self) {
        self.0.borrow_mut().fail_recv += 1;
    }

    /// Queue one inbound message and raise a readable edge.
    pub fn deliver(&self, frames: &[&str]) {
        let notifier = {
            let mut script = self.0.borrow_mut();
            let last = frames.len().saturating_sub(1);
            for (i, f) in frames.iter().enumerate() {
                script
                    .inbound
                    .push_back((Bytes::copy_from_slice(f.as_bytes()), i != last));
            }
            script.notifier.clone()
        };
        if let Some(n) = notifier {
            n.notify(Readiness::READABLE);
        }
    }

    /// Queue raw frames without raising an edge.
    pub fn queue_frames(&self, frames: &[(&str, bool)]) {
        let mut script = self.0.borrow_mut();
        for (f, more) in frames {
            script
                .inbound
                .push_back((Bytes::copy_from_slice(f.as_bytes()), *more));
        }
    }

    pub fn sent_strings(&self) -> Vec<String> {
        self.0
            .borrow()
            .sent
            .iter()
            .map(|(b, _)| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    pub fn sent_flags(&self) -> Vec<bool> {
        self.0.borrow().sent.iter().map(|(_, more)| *more).collect()
    }

    pub fn write_interest(&self) -> bool {
        self.0.borrow().write_interest
    }

    pub fn send_attempts(&self) -> usize {
        self.0.borrow().send_attempts
    }
}

pub struct ScriptedTransport {
    socket_type: SocketType,
    script: Rc<RefCell<Script>>,
}

impl Transport for ScriptedTransport {
    fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    fn set_notifier(&mut self, notifier: ReadyNotifier) {
        self.script.borrow_mut().notifier = Some(notifier);
    }

    fn readiness(&self) -> Readiness {
        let script = self.script.borrow();
        Readiness {
            readable: !script.inbound.is_empty(),
            writable: script.budget.map_or(true, |b| b > 0),
        }
    }

    fn set_write_interest(&mut self, pending: bool) {
        self.script.borrow_mut().write_interest = pending;
    }

    fn send_frame(&mut self, frame: &Frame, flags: SendFlags) -> Result<SendStatus> {
        let mut script = self.script.borrow_mut();
        if script.closed {
            return Err(Error::SocketClosed);
        }
        script.send_attempts += 1;

        if script.fail_sends > 0 {
            script.fail_sends -= 1;
            // drop accepted frames of the failed message
            while script.sent.last().is_some_and(|(_, more)| *more) {
                script.sent.pop();
            }
            return Err(Error::Unroutable {
                identity: frame.bytes().clone(),
            });
        }

        match script.budget {
            Some(0) => return Ok(SendStatus::WouldBlock),
            Some(ref mut n) => *n -= 1,
            None => {}
        }
        script.sent.push((frame.bytes().clone(), flags.more()));
        Ok(SendStatus::Sent)
    }

    fn recv_frame(&mut self) -> Result<Option<Bytes>> {
        let mut script = self.script.borrow_mut();
        if script.fail_recv > 0 {
            script.fail_recv -= 1;
            return Err(Error::transport("receive failed"));
        }
        match script.inbound.pop_front() {
            Some((frame, more)) => {
                script.last_more = more;
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    fn has_more(&self) -> bool {
        self.script.borrow().last_more
    }

    fn bind(&mut self, endpoint: &str) -> Result<()> {
        if !endpoint.starts_with("inproc://") {
            return Err(Error::InvalidEndpoint(endpoint.to_string()));
        }
        self.script.borrow_mut().bound.push(endpoint.to_string());
        Ok(())
    }

    fn unbind(&mut self, endpoint: &str) -> Result<()> {
        let mut script = self.script.borrow_mut();
        let before = script.bound.len();
        script.bound.retain(|e| e != endpoint);
        if script.bound.len() == before {
            return Err(Error::EndpointNotFound(endpoint.to_string()));
        }
        Ok(())
    }

    fn connect(&mut self, endpoint: &str) -> Result<()> {
        self.script.borrow_mut().connected.push(endpoint.to_string());
        Ok(())
    }

    fn disconnect(&mut self, endpoint: &str) -> Result<()> {
        self.script.borrow_mut().connected.retain(|e| e != endpoint);
        Ok(())
    }

    fn set_option(&mut self, option: SocketOption, value: OptionValue) -> Result<()> {
        self.script.borrow_mut().options.set(option, value)
    }

    fn get_option(&self, option: SocketOption) -> Result<OptionValue> {
        let script = self.script.borrow();
        Ok(match option {
            SocketOption::SndHwm => OptionValue::from(script.options.send_hwm()),
            SocketOption::RcvHwm => OptionValue::from(script.options.recv_hwm()),
            SocketOption::Linger => OptionValue::Int(script.options.linger()),
            other => script
                .options
                .get(other)
                .cloned()
                .ok_or_else(|| Error::UnknownOption(other.name().to_string()))?,
        })
    }

    fn close(&mut self) {
        let mut script = self.script.borrow_mut();
        script.closed = true;
        script.inbound.clear();
        script.notifier = None;
    }
}

/// A socket over a fresh script, plus the handle to steer it.
pub fn scripted(socket_type: SocketType) -> (Socket<ScriptedTransport>, ScriptHandle) {
    let script = Rc::new(RefCell::new(Script::default()));
    let transport = ScriptedTransport {
        socket_type,
        script: Rc::clone(&script),
    };
    (Socket::new(transport), ScriptHandle(script))
}

/// Collect string forms of delivered messages.
pub fn record_messages(
    socket: &Socket<ScriptedTransport>,
) -> Rc<RefCell<Vec<Vec<String>>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    socket.on_message(move |_, msg| sink.borrow_mut().push(msg.to_strings()));
    log
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
