//! Diagnostic trace hooks.
//!
//! A single process-wide hook receives one-byte record identifiers plus a
//! payload (usually the object name). With no hook installed the emit sites
//! cost one critical-section entry. The hook runs outside any kernel lock
//! and must not call back into blocking kernel APIs.

use std::cell::RefCell;
use std::sync::Arc;

use critical_section::Mutex;

/// Trace sink: receives a record identifier and its payload.
pub type TraceHook = Arc<dyn Fn(u8, &[u8]) + Send + Sync>;

/// Trace record identifiers.
pub mod records {
    pub const THREAD_CREATE: u8 = 1;
    pub const THREAD_EXIT: u8 = 2;
    pub const THREAD_DESTROY: u8 = 3;
    pub const THREAD_SUSPEND: u8 = 4;
    pub const THREAD_WAKEUP: u8 = 5;
    pub const THREAD_JOIN: u8 = 6;
    pub const SIG_RAISE: u8 = 7;
    pub const MQ_SEND: u8 = 8;
    pub const MQ_RECEIVE: u8 = 9;
    pub const MQ_RESET: u8 = 10;
    pub const SCHED_START: u8 = 11;
}

static HOOK: Mutex<RefCell<Option<TraceHook>>> = Mutex::new(RefCell::new(None));

/// Installs (or, with `None`, removes) the process-wide trace hook.
pub fn set_hook(hook: Option<TraceHook>) {
    critical_section::with(|cs| {
        *HOOK.borrow_ref_mut(cs) = hook;
    });
}

/// Emits one trace record.
pub(crate) fn emit(record: u8, payload: &[u8]) {
    let hook = critical_section::with(|cs| HOOK.borrow_ref(cs).clone());
    if let Some(hook) = hook {
        hook(record, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn hook_receives_records() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        set_hook(Some(Arc::new(move |record, payload| {
            sink.lock().unwrap().push((record, payload.to_vec()));
        })));

        emit(records::THREAD_CREATE, b"trace-probe");
        set_hook(None);
        emit(records::THREAD_EXIT, b"trace-probe");

        // Other tests run concurrently and may emit while the hook is
        // installed; only the probe records matter here.
        let entries = log.lock().unwrap();
        let probes: Vec<_> = entries
            .iter()
            .filter(|(_, payload)| payload == b"trace-probe")
            .collect();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].0, records::THREAD_CREATE);
    }
}
