use async_trait::async_trait;
use std::sync::Arc;

use crate::commands::{Command, Invocation};
use crate::dmesg::DmesgRing;
use crate::errors::KernelResult;

/// Prints the kernel message ring, oldest first.
pub struct Dmesg {
    ring: Arc<DmesgRing>,
}

impl Dmesg {
    pub fn new(ring: Arc<DmesgRing>) -> Self {
        Dmesg { ring }
    }
}

#[async_trait]
impl Command for Dmesg {
    fn name(&self) -> &'static str {
        "dmesg"
    }

    fn summary(&self) -> &'static str {
        "print kernel ring buffer messages"
    }

    async fn run(&self, _invocation: Invocation) -> KernelResult<String> {
        let records = self.ring.records();
        if records.is_empty() {
            return Ok(String::new());
        }
        let lines: Vec<String> = records.iter().map(|r| r.render()).collect();
        Ok(format!("{}\n", lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::detached_invocation;

    #[tokio::test]
    async fn renders_one_line_per_record() {
        let ring = Arc::new(DmesgRing::new(8));
        ring.info("Kernel initialized");
        ring.warn("low on ticks");

        let out = Dmesg::new(Arc::clone(&ring))
            .run(detached_invocation(&[]))
            .await
            .unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("info Kernel initialized"));
        assert!(lines[1].contains("warn low on ticks"));
    }

    #[tokio::test]
    async fn empty_ring_prints_nothing() {
        let ring = Arc::new(DmesgRing::new(8));
        let out = Dmesg::new(ring).run(detached_invocation(&[])).await.unwrap();
        assert_eq!(out, "");
    }
}
