//! Dynamic foreign-function bridge.
//!
//! Loads a native library by path and calls an exported function with the
//! fixed signature `(FfiValue*, int) -> FfiValue`. The language core does not
//! depend on this module; it exists for embedders and native extensions.

use std::ffi::{CStr, CString};

use libc::{c_char, c_int, c_void};
use thiserror::Error;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiType {
    Null = 0,
    Int = 1,
    Float = 2,
    String = 3,
    Bool = 4,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union FfiData {
    pub int_val: i64,
    pub float_val: f64,
    pub string_val: *const c_char,
    pub bool_val: c_int,
}

/// C-compatible tagged value crossing the FFI boundary.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FfiValue {
    pub ty: FfiType,
    pub data: FfiData,
}

/// The one supported exported-function shape.
pub type FfiFunction = unsafe extern "C" fn(*mut FfiValue, c_int) -> FfiValue;

/// Host-side view of an [FfiValue].
#[derive(Debug, Clone, PartialEq)]
pub enum FfiArg {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

#[derive(Error, Debug)]
pub enum FfiError {
    #[error("failed to open library '{path}': {reason}")]
    LibraryOpen { path: String, reason: String },
    #[error("symbol '{name}' not found: {reason}")]
    SymbolNotFound { name: String, reason: String },
    #[error("invalid library or function name")]
    InvalidName,
}

struct LibraryHandle {
    handle: *mut c_void,
    #[allow(dead_code)]
    path: String,
}

impl Drop for LibraryHandle {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                libc::dlclose(self.handle);
            }
        }
    }
}

/// Keeps long-lived library handles open and performs one-shot calls.
/// Handles are closed on drop, so the library is released on every exit
/// path.
#[derive(Default)]
pub struct FfiBridge {
    libraries: Vec<LibraryHandle>,
}

impl FfiBridge {
    pub fn new() -> Self {
        Self {
            libraries: Vec::new(),
        }
    }

    /// Opens a library and keeps it loaded until [FfiBridge::unload_all] or
    /// drop. Returns false when the loader rejects the path.
    pub fn load_library(&mut self, path: &str) -> bool {
        let Ok(c_path) = CString::new(path) else {
            return false;
        };
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
        if handle.is_null() {
            return false;
        }
        self.libraries.push(LibraryHandle {
            handle,
            path: path.to_string(),
        });
        true
    }

    pub fn unload_all(&mut self) {
        self.libraries.clear();
    }

    /// Opens `lib_path`, resolves `func_name` against the fixed call
    /// signature, invokes it and closes the library again. Argument strings
    /// are freed after the call on every path.
    pub fn call(
        &self,
        lib_path: &str,
        func_name: &str,
        args: &[FfiArg],
    ) -> Result<FfiArg, FfiError> {
        let c_path = CString::new(lib_path).map_err(|_| FfiError::InvalidName)?;
        let c_func = CString::new(func_name).map_err(|_| FfiError::InvalidName)?;

        unsafe {
            let handle = libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW);
            if handle.is_null() {
                return Err(FfiError::LibraryOpen {
                    path: lib_path.to_string(),
                    reason: dl_error(),
                });
            }

            let symbol = libc::dlsym(handle, c_func.as_ptr());
            if symbol.is_null() {
                let reason = dl_error();
                libc::dlclose(handle);
                return Err(FfiError::SymbolNotFound {
                    name: func_name.to_string(),
                    reason,
                });
            }
            let function: FfiFunction = std::mem::transmute(symbol);

            let mut ffi_args: Vec<FfiValue> = args.iter().map(to_ffi_value).collect();
            let result = function(ffi_args.as_mut_ptr(), ffi_args.len() as c_int);
            for arg in &mut ffi_args {
                free_value(arg);
            }

            let converted = from_ffi_value(&result);
            libc::dlclose(handle);
            Ok(converted)
        }
    }
}

fn dl_error() -> String {
    unsafe {
        let err = libc::dlerror();
        if err.is_null() {
            String::new()
        } else {
            CStr::from_ptr(err).to_string_lossy().into_owned()
        }
    }
}

pub fn to_ffi_value(arg: &FfiArg) -> FfiValue {
    match arg {
        FfiArg::Null => FfiValue {
            ty: FfiType::Null,
            data: FfiData { int_val: 0 },
        },
        FfiArg::Int(i) => FfiValue {
            ty: FfiType::Int,
            data: FfiData { int_val: *i },
        },
        FfiArg::Float(f) => FfiValue {
            ty: FfiType::Float,
            data: FfiData { float_val: *f },
        },
        FfiArg::Str(s) => {
            let ptr = CString::new(s.as_str())
                .map(CString::into_raw)
                .unwrap_or(std::ptr::null_mut());
            FfiValue {
                ty: FfiType::String,
                data: FfiData {
                    string_val: ptr as *const c_char,
                },
            }
        }
        FfiArg::Bool(b) => FfiValue {
            ty: FfiType::Bool,
            data: FfiData {
                bool_val: *b as c_int,
            },
        },
    }
}

/// Frees a string allocated by [to_ffi_value]. Safe to call twice: the
/// pointer is nulled on the first pass.
///
/// # Safety
/// `value` must have been produced by [to_ffi_value].
pub unsafe fn free_value(value: &mut FfiValue) {
    if value.ty == FfiType::String {
        let ptr = unsafe { value.data.string_val };
        if !ptr.is_null() {
            drop(unsafe { CString::from_raw(ptr as *mut c_char) });
            value.data.string_val = std::ptr::null();
        }
    }
}

pub fn from_ffi_value(value: &FfiValue) -> FfiArg {
    unsafe {
        match value.ty {
            FfiType::Null => FfiArg::Null,
            FfiType::Int => FfiArg::Int(value.data.int_val),
            FfiType::Float => FfiArg::Float(value.data.float_val),
            FfiType::String => {
                if value.data.string_val.is_null() {
                    FfiArg::Str(String::new())
                } else {
                    FfiArg::Str(
                        CStr::from_ptr(value.data.string_val)
                            .to_string_lossy()
                            .into_owned(),
                    )
                }
            }
            FfiType::Bool => FfiArg::Bool(value.data.bool_val != 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_values_round_trip() {
        for arg in [
            FfiArg::Null,
            FfiArg::Int(-42),
            FfiArg::Float(2.5),
            FfiArg::Bool(true),
            FfiArg::Bool(false),
        ] {
            let mut value = to_ffi_value(&arg);
            assert_eq!(from_ffi_value(&value), arg);
            unsafe { free_value(&mut value) };
        }
    }

    #[test]
    fn strings_round_trip_and_free_is_idempotent() {
        let arg = FfiArg::Str("hello ffi".to_string());
        let mut value = to_ffi_value(&arg);
        assert_eq!(value.ty, FfiType::String);
        assert_eq!(from_ffi_value(&value), arg);
        unsafe {
            free_value(&mut value);
            assert!(value.data.string_val.is_null());
            // second free is a no-op
            free_value(&mut value);
        }
        assert_eq!(from_ffi_value(&value), FfiArg::Str(String::new()));
    }

    #[test]
    fn loading_a_missing_library_fails_cleanly() {
        let mut bridge = FfiBridge::new();
        assert!(!bridge.load_library("/definitely/not/a/library.so"));
        assert!(!bridge.load_library("bad\0name"));
    }

    #[test]
    fn calling_into_a_missing_library_reports_the_loader_error() {
        let bridge = FfiBridge::new();
        let result = bridge.call("/definitely/not/a/library.so", "fn", &[]);
        assert!(matches!(result, Err(FfiError::LibraryOpen { .. })));
        let result = bridge.call("lib\0", "fn", &[]);
        assert!(matches!(result, Err(FfiError::InvalidName)));
    }
}
