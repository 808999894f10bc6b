// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! OS scheduling priority for the dedicated controller thread.
//!
//! On Linux each thread has its own nice value, so `setpriority` on the
//! thread id only affects the control loop. Raising priority needs
//! `CAP_SYS_NICE` (or root); without it the call fails and the loop runs at
//! normal priority.

use crate::config::SchedulingMode;

/// Priority requested by the thread scheduling modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadPriority {
    Normal,
    AboveNormal,
    Highest,
}

impl ThreadPriority {
    /// The thread priority for a scheduling mode, or `None` for the async mode.
    pub fn for_mode(mode: SchedulingMode) -> Option<Self> {
        match mode {
            SchedulingMode::AsyncTask => None,
            SchedulingMode::NormalThread => Some(ThreadPriority::Normal),
            SchedulingMode::AboveNormalThread => Some(ThreadPriority::AboveNormal),
            SchedulingMode::HighestThread => Some(ThreadPriority::Highest),
        }
    }

    /// Nice value used on Linux. Lower is more favourable.
    pub fn nice(self) -> i32 {
        match self {
            ThreadPriority::Normal => 0,
            ThreadPriority::AboveNormal => -5,
            ThreadPriority::Highest => -10,
        }
    }
}

/// Apply `priority` to the calling thread. `Normal` leaves the thread untouched.
#[cfg(target_os = "linux")]
pub fn apply_to_current_thread(priority: ThreadPriority) -> Result<(), nix::Error> {
    if priority == ThreadPriority::Normal {
        return Ok(());
    }

    let tid = nix::unistd::gettid();
    // SAFETY: setpriority only reads its integer arguments.
    let rc = unsafe {
        libc::setpriority(libc::PRIO_PROCESS, tid.as_raw() as libc::id_t, priority.nice())
    };
    if rc == -1 {
        return Err(nix::errno::Errno::last());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn apply_to_current_thread(priority: ThreadPriority) -> Result<(), nix::Error> {
    log::debug!("Thread priority {priority:?} not supported on this platform, ignoring");
    Ok(())
}
