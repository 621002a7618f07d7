use super::*;
use anyhow::format_err;
use parking_lot::{Condvar, Mutex, MutexGuard};

type InMemoryLogInner = Vec<Event>;

#[derive(Default)]
pub struct InMemoryLog {
    inner: Mutex<InMemoryLogInner>,
    condvar: Condvar,
}

impl InMemoryLog {
    pub fn lock(&self) -> MutexGuard<'_, InMemoryLogInner> {
        self.inner.lock()
    }
}

impl Reader for InMemoryLog {
    fn read(
        &self,
        offset: Offset,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<WithOffset<Vec<LogEvent>>> {
        let offset_usize = usize::try_from(offset)?;

        let mut read = self.lock();

        if limit > 0 {
            let is_empty = |log: &mut InMemoryLogInner| log.len() <= offset_usize;
            match timeout {
                Some(timeout) => {
                    self.condvar.wait_while_for(&mut read, is_empty, timeout);
                }
                None => self.condvar.wait_while(&mut read, is_empty),
            }
        }

        let data: Vec<_> = read
            .get(offset_usize..)
            .ok_or_else(|| format_err!("offset {} is past the end of the log", offset))?
            .iter()
            .take(limit)
            .zip(offset..)
            .map(|(e, offset)| LogEvent {
                offset,
                details: e.clone(),
            })
            .collect();

        Ok(WithOffset {
            offset: offset + u64::try_from(data.len())?,
            data,
        })
    }

    fn get_start_offset(&self) -> Result<Offset> {
        Ok(0)
    }
}

impl Writer for InMemoryLog {
    fn write(&self, events: &[Event]) -> Result<Offset> {
        let mut write = self.lock();

        write.extend_from_slice(events);
        self.condvar.notify_all();

        Ok(u64::try_from(write.len())?)
    }
}

pub fn new_in_memory_shared() -> (SharedWriter, SharedReader) {
    let log = Arc::new(InMemoryLog::default());
    (log.clone(), log)
}
