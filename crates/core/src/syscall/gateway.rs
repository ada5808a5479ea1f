//! Name-keyed syscall dispatch.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::dmesg::DmesgRing;
use crate::errors::{KernelError, KernelResult};
use crate::syscall::params::{SyscallParams, SyscallReply};

/// An installed syscall implementation.
pub type SyscallHandler =
    Arc<dyn Fn(SyscallParams) -> BoxFuture<'static, KernelResult<SyscallReply>> + Send + Sync>;

/// Routes syscall requests to their registered handlers.
///
/// One handler per name; registering a name twice replaces the earlier
/// handler and logs a warning. Dispatch clones the handler out of the
/// registry, so emitting never holds the lock across an await.
pub struct SyscallGateway {
    handlers: Mutex<HashMap<String, SyscallHandler>>,
    dmesg: Arc<DmesgRing>,
}

impl SyscallGateway {
    pub fn new(dmesg: Arc<DmesgRing>) -> Self {
        SyscallGateway {
            handlers: Mutex::new(HashMap::new()),
            dmesg,
        }
    }

    /// Installs `handler` under `name`, last writer wins.
    pub fn on<F>(&self, name: &str, handler: F)
    where
        F: Fn(SyscallParams) -> BoxFuture<'static, KernelResult<SyscallReply>>
            + Send
            + Sync
            + 'static,
    {
        let previous = self
            .lock()
            .insert(name.to_string(), Arc::new(handler) as SyscallHandler);
        if previous.is_some() {
            self.dmesg
                .warn(format!("syscall '{name}' re-registered, replacing handler"));
        }
    }

    /// Dispatches a request to the handler registered for its name.
    ///
    /// # Errors
    ///
    /// `NotFound` when no handler is installed; otherwise whatever the
    /// handler itself returns.
    pub async fn emit(&self, params: SyscallParams) -> KernelResult<SyscallReply> {
        let name = params.name();
        let handler = self.lock().get(name).cloned();
        match handler {
            Some(handler) => handler(params).await,
            None => {
                self.dmesg.warn(format!("unknown syscall '{name}'"));
                Err(KernelError::not_found(format!("unknown syscall: {name}")))
            }
        }
    }

    /// True once a handler is installed under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SyscallHandler>> {
        match self.handlers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn gateway() -> SyscallGateway {
        SyscallGateway::new(Arc::new(DmesgRing::new(16)))
    }

    #[tokio::test]
    async fn dispatches_to_the_registered_handler() {
        let gw = gateway();
        gw.on("proc.list", |_| {
            Box::pin(async { Ok(SyscallReply::Flag(true)) })
        });

        let reply = gw.emit(SyscallParams::ProcList).await.unwrap();
        assert!(reply.into_flag().unwrap());
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let gw = gateway();
        let err = gw.emit(SyscallParams::ProcList).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "unknown syscall: proc.list");
    }

    #[tokio::test]
    async fn re_registration_replaces_and_warns() {
        let dmesg = Arc::new(DmesgRing::new(16));
        let gw = SyscallGateway::new(Arc::clone(&dmesg));
        gw.on("proc.kill", |_| {
            Box::pin(async { Ok(SyscallReply::Flag(false)) })
        });
        gw.on("proc.kill", |_| {
            Box::pin(async { Ok(SyscallReply::Flag(true)) })
        });

        let reply = gw
            .emit(SyscallParams::ProcKill { pid: 9 })
            .await
            .unwrap();
        assert!(reply.into_flag().unwrap());
        assert!(dmesg
            .records()
            .iter()
            .any(|r| r.message.contains("re-registered")));
    }

    #[tokio::test]
    async fn handler_errors_propagate() {
        let gw = gateway();
        gw.on("proc.wait", |_| {
            Box::pin(async { Err(KernelError::not_found("no process with pid 42")) })
        });

        let err = gw
            .emit(SyscallParams::ProcWait { pid: 42 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
