//! Hidden-window process launch for the Windows solver.
//!
//! EquiSage is a GUI program, so suppressing a console is not enough: the
//! process is created with `STARTF_USESHOWWINDOW` and `SW_HIDE` so its first
//! `ShowWindow` call keeps the main window hidden.

use std::ffi::OsStr;
use std::io;
use std::iter;
use std::mem;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::ptr;
use std::time::Duration;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows_sys::Win32::System::Threading::{
    CreateProcessW, GetExitCodeProcess, INFINITE, PROCESS_INFORMATION, STARTF_USESHOWWINDOW,
    STARTUPINFOW, TerminateProcess, WaitForSingleObject,
};
use windows_sys::Win32::UI::WindowsAndMessaging::SW_HIDE;

/// Exit code reported for a process we terminated.
const TERMINATED_EXIT_CODE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum HiddenOutcome {
    Exited { code: u32 },
    TimedOut,
}

struct OwnedHandle(HANDLE);

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { CloseHandle(self.0) };
        }
    }
}

fn wide(value: &OsStr) -> Vec<u16> {
    value.encode_wide().chain(iter::once(0)).collect()
}

/// Append one argument using the quoting rules of `CommandLineToArgvW`.
fn push_arg(line: &mut Vec<u16>, arg: &OsStr) {
    const QUOTE: u16 = b'"' as u16;
    const BACKSLASH: u16 = b'\\' as u16;

    let needs_quotes = arg.is_empty()
        || arg
            .encode_wide()
            .any(|unit| unit == b' ' as u16 || unit == b'\t' as u16 || unit == QUOTE);
    if !needs_quotes {
        line.extend(arg.encode_wide());
        return;
    }

    line.push(QUOTE);
    let mut backslashes = 0usize;
    for unit in arg.encode_wide() {
        if unit == BACKSLASH {
            backslashes += 1;
        } else {
            if unit == QUOTE {
                line.extend(iter::repeat_n(BACKSLASH, backslashes + 1));
            }
            backslashes = 0;
        }
        line.push(unit);
    }
    line.extend(iter::repeat_n(BACKSLASH, backslashes));
    line.push(QUOTE);
}

pub(super) fn command_line(exe: &Path, args: &[&OsStr]) -> Vec<u16> {
    let mut line = Vec::new();
    push_arg(&mut line, exe.as_os_str());
    for arg in args {
        line.push(b' ' as u16);
        push_arg(&mut line, arg);
    }
    line.push(0);
    line
}

/// Start `exe` hidden in `cwd` and block until it exits or `timeout` passes.
/// A process still running at the deadline is terminated.
pub(super) fn run_hidden(
    exe: &Path,
    args: &[&OsStr],
    cwd: &Path,
    timeout: Duration,
) -> io::Result<HiddenOutcome> {
    let application = wide(exe.as_os_str());
    let mut line = command_line(exe, args);
    let directory = wide(cwd.as_os_str());

    let mut startup: STARTUPINFOW = unsafe { mem::zeroed() };
    startup.cb = mem::size_of::<STARTUPINFOW>() as u32;
    startup.dwFlags = STARTF_USESHOWWINDOW;
    startup.wShowWindow = SW_HIDE as u16;
    let mut info: PROCESS_INFORMATION = unsafe { mem::zeroed() };

    let created = unsafe {
        CreateProcessW(
            application.as_ptr(),
            line.as_mut_ptr(),
            ptr::null(),
            ptr::null(),
            0,
            0,
            ptr::null(),
            directory.as_ptr(),
            &startup,
            &mut info,
        )
    };
    if created == 0 {
        return Err(io::Error::last_os_error());
    }
    let process = OwnedHandle(info.hProcess);
    drop(OwnedHandle(info.hThread));

    let millis = u32::try_from(timeout.as_millis())
        .unwrap_or(INFINITE - 1)
        .min(INFINITE - 1);
    match unsafe { WaitForSingleObject(process.0, millis) } {
        WAIT_OBJECT_0 => {
            let mut code = 0u32;
            if unsafe { GetExitCodeProcess(process.0, &mut code) } == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(HiddenOutcome::Exited { code })
        }
        WAIT_TIMEOUT => {
            unsafe { TerminateProcess(process.0, TERMINATED_EXIT_CODE) };
            unsafe { WaitForSingleObject(process.0, INFINITE) };
            Ok(HiddenOutcome::TimedOut)
        }
        _ => Err(io::Error::last_os_error()),
    }
}
