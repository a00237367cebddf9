use rustix::process::{getrlimit, setrlimit, Resource, Rlimit};

/// slapd with mdb misbehaves under the usual 1024 descriptor default
pub const NOFILE_LIMIT: u64 = 8192;

/// Limit to request given the current one. `None` means unlimited.
fn target_limit(current: &Rlimit, wanted: u64) -> Rlimit {
    let maximum = match current.maximum {
        Some(hard) if hard < wanted => Some(wanted),
        other => other,
    };

    Rlimit {
        current: Some(wanted),
        maximum,
    }
}

/// Raise RLIMIT_NOFILE of this process, inherited by slapd after exec
pub fn raise_nofile(wanted: u64) -> rustix::io::Result<()> {
    let current = getrlimit(Resource::Nofile);
    setrlimit(Resource::Nofile, target_limit(&current, wanted))
}
