use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::ExtractError;
use crate::extract::MediaStream;

/// RAII guard for one external-tool slot. Dropping it frees the slot.
pub struct Permit {
    #[allow(dead_code)]
    permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit").finish()
    }
}

impl Permit {
    /// Keep this permit alive until `stream` is exhausted or dropped.
    pub fn attach(self, stream: MediaStream) -> MediaStream {
        Box::pin(async_stream::stream! {
            let _permit = self;
            let mut stream = stream;
            while let Some(item) = stream.next().await {
                yield item;
            }
        })
    }
}

/// Bounded admission for concurrent external-tool invocations.
///
/// Acquisition never waits: when every slot is taken the caller gets
/// [`ExtractError::Busy`] immediately and can surface it as "try later".
#[derive(Debug, Clone)]
pub struct Admission {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl Admission {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn try_acquire(&self) -> Result<Permit, ExtractError> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .map(|permit| Permit { permit })
            .map_err(|_| ExtractError::Busy {
                limit: self.capacity,
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn permit_acquired_and_released() {
        let admission = Admission::new(2);
        let p1 = admission.try_acquire().expect("first permit");
        let p2 = admission.try_acquire().expect("second permit");
        assert!(
            matches!(admission.try_acquire(), Err(ExtractError::Busy { limit: 2 })),
            "third permit should be denied"
        );
        drop(p1);
        let _p3 = admission.try_acquire().expect("permit after release");
        drop(p2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let admission = Admission::new(0);
        assert_eq!(admission.capacity(), 1);
        assert!(admission.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn attached_permit_lives_until_stream_is_dropped() {
        let admission = Admission::new(1);
        let permit = admission.try_acquire().unwrap();
        let inner: MediaStream = Box::pin(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"a")),
            Ok(Bytes::from_static(b"b")),
        ]));
        let mut stream = permit.attach(inner);

        assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from_static(b"a"));
        assert_eq!(admission.available(), 0);

        drop(stream);
        assert_eq!(admission.available(), 1);
    }
}
