//! Inotify watch on the credential file (spec.md §4.5.4, §6).
//!
//! Watches `/etc/shadow` for the config audit's shadow-signature check.
//! Per spec.md §4.5: "re-arms on `IN_IGNORED`" — some filesystem
//! operations (an atomic replace via rename, for instance) invalidate an
//! inotify watch descriptor entirely rather than emitting a normal modify
//! event, so the watch must be re-established whenever that happens
//! rather than assumed to still be live.

use std::io;
use std::path::{Path, PathBuf};

use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};
use tracing::{info, warn};

pub struct CredentialWatch {
    inotify: Inotify,
    path: PathBuf,
    watch: WatchDescriptor,
    buffer: [u8; 4096],
}

impl CredentialWatch {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut inotify = Inotify::init()?;
        let watch = inotify.watches().add(&path, WatchMask::MODIFY | WatchMask::ATTRIB)?;
        Ok(Self {
            inotify,
            path,
            watch,
            buffer: [0; 4096],
        })
    }

    /// Drains pending events; returns `true` if the credential file
    /// changed since the last poll. Re-arms the watch transparently if the
    /// kernel dropped it (`IN_IGNORED`).
    pub fn poll(&mut self) -> bool {
        let events = match self.inotify.read_events(&mut self.buffer) {
            Ok(events) => events,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return false,
            Err(e) => {
                warn!(error = %e, "inotify read failed");
                return false;
            }
        };

        let mut changed = false;
        let mut needs_rearm = false;
        for event in events {
            if event.mask.contains(EventMask::IGNORED) {
                needs_rearm = true;
            } else {
                changed = true;
            }
        }

        if needs_rearm {
            match self.inotify.watches().add(&self.path, WatchMask::MODIFY | WatchMask::ATTRIB) {
                Ok(watch) => {
                    info!(path = %self.path.display(), "credential watch re-armed after IN_IGNORED");
                    self.watch = watch;
                }
                Err(e) => warn!(path = %self.path.display(), error = %e, "failed to re-arm credential watch"),
            }
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn watch_detects_a_modification() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut watch = CredentialWatch::new(file.path()).unwrap();

        writeln!(file, "root:$6$abc:19000:0:99999:7:::").unwrap();
        file.flush().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(watch.poll());
    }
}
