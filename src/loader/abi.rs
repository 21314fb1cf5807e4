//! Host side of the script ABI.
//!
//! Mirrors the `host` module generated into every artifact. The layout of
//! [`HostApi`] and the callback signatures must match it exactly.

use std::cell::RefCell;
use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::slice;

use crate::host::OutputSink;

pub const ABI_VERSION: u32 = 1;
pub const ABI_SYMBOL: &[u8] = b"SCRIPTHOST_ABI_VERSION\0";
pub const INVOKE_SYMBOL: &[u8] = b"scripthost_invoke\0";

const FAILURE_RETURNED: u32 = 0;

#[repr(C)]
pub struct HostApi {
    pub abi: u32,
    pub ctx: *mut c_void,
    pub output_line: extern "C" fn(*mut c_void, *const u8, usize),
    pub clear_output: extern "C" fn(*mut c_void),
    pub report_failure: extern "C" fn(*mut c_void, u32, *const u8, usize, u32, u32, *const u8, usize),
}

pub type InvokeFn = unsafe extern "C" fn(*const HostApi) -> u32;

/// What the script reported before returning a failure status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The entry point returned `Err`, already rendered with `{:?}`.
    Returned(String),
    /// The entry point panicked; `line == 0` means no location was captured.
    Panicked {
        file: String,
        line: u32,
        column: u32,
        message: String,
    },
}

/// State shared with the callbacks for one invocation.
pub struct CallContext<'a> {
    sink: &'a dyn OutputSink,
    failure: RefCell<Option<Failure>>,
}

impl<'a> CallContext<'a> {
    pub fn new(sink: &'a dyn OutputSink) -> Self {
        Self {
            sink,
            failure: RefCell::new(None),
        }
    }

    /// The table handed to the artifact. Valid while `self` is.
    pub fn api(&self) -> HostApi {
        HostApi {
            abi: ABI_VERSION,
            ctx: std::ptr::from_ref(self).cast::<c_void>().cast_mut(),
            output_line,
            clear_output,
            report_failure,
        }
    }

    pub fn take_failure(&self) -> Option<Failure> {
        self.failure.borrow_mut().take()
    }
}

/// # Safety
/// `ctx` must come from [`CallContext::api`] and still be alive.
unsafe fn context<'a>(ctx: *mut c_void) -> &'a CallContext<'a> {
    unsafe { &*ctx.cast::<CallContext<'a>>() }
}

/// # Safety
/// `ptr` must be null or valid for `len` bytes.
unsafe fn text(ptr: *const u8, len: usize) -> String {
    if ptr.is_null() || len == 0 {
        return String::new();
    }
    let bytes = unsafe { slice::from_raw_parts(ptr, len) };
    String::from_utf8_lossy(bytes).into_owned()
}

// Panics must not unwind back into the artifact.

extern "C" fn output_line(ctx: *mut c_void, ptr: *const u8, len: usize) {
    let ctx = unsafe { context(ctx) };
    let line = unsafe { text(ptr, len) };
    let _ = panic::catch_unwind(AssertUnwindSafe(|| ctx.sink.output_line(&line)));
}

extern "C" fn clear_output(ctx: *mut c_void) {
    let ctx = unsafe { context(ctx) };
    let _ = panic::catch_unwind(AssertUnwindSafe(|| ctx.sink.clear_output()));
}

#[allow(clippy::too_many_arguments)]
extern "C" fn report_failure(
    ctx: *mut c_void,
    kind: u32,
    file_ptr: *const u8,
    file_len: usize,
    line: u32,
    column: u32,
    msg_ptr: *const u8,
    msg_len: usize,
) {
    let ctx = unsafe { context(ctx) };
    let message = unsafe { text(msg_ptr, msg_len) };
    let failure = if kind == FAILURE_RETURNED {
        Failure::Returned(message)
    } else {
        Failure::Panicked {
            file: unsafe { text(file_ptr, file_len) },
            line,
            column,
            message,
        }
    };
    *ctx.failure.borrow_mut() = Some(failure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        lines: Mutex<Vec<String>>,
        clears: Mutex<usize>,
    }

    impl OutputSink for Recording {
        fn output_line(&self, text: &str) {
            self.lines.lock().push(text.to_string());
        }

        fn clear_output(&self) {
            *self.clears.lock() += 1;
        }
    }

    #[test]
    fn test_callbacks_reach_sink() {
        let sink = Recording::default();
        let ctx = CallContext::new(&sink);
        let api = ctx.api();

        let line = "hello";
        (api.output_line)(api.ctx, line.as_ptr(), line.len());
        (api.clear_output)(api.ctx);

        assert_eq!(*sink.lines.lock(), vec!["hello".to_string()]);
        assert_eq!(*sink.clears.lock(), 1);
        assert_eq!(api.abi, ABI_VERSION);
    }

    #[test]
    fn test_report_failure_kinds() {
        let sink = Recording::default();
        let ctx = CallContext::new(&sink);
        let api = ctx.api();

        let msg = "\"bad input\"";
        (api.report_failure)(api.ctx, 0, std::ptr::null(), 0, 0, 0, msg.as_ptr(), msg.len());
        assert_eq!(ctx.take_failure(), Some(Failure::Returned(msg.to_string())));

        let file = "/s/a.rs";
        let msg = "boom";
        (api.report_failure)(api.ctx, 1, file.as_ptr(), file.len(), 4, 9, msg.as_ptr(), msg.len());
        assert_eq!(
            ctx.take_failure(),
            Some(Failure::Panicked {
                file: file.to_string(),
                line: 4,
                column: 9,
                message: "boom".to_string(),
            })
        );
        assert_eq!(ctx.take_failure(), None);
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        struct Exploding;
        impl OutputSink for Exploding {
            fn output_line(&self, _: &str) {
                panic!("sink failed");
            }
            fn clear_output(&self) {}
        }

        let sink = Exploding;
        let ctx = CallContext::new(&sink);
        let api = ctx.api();
        (api.output_line)(api.ctx, "x".as_ptr(), 1);
    }
}
