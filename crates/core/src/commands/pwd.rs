use async_trait::async_trait;

use crate::commands::{Command, Invocation};
use crate::errors::KernelResult;

/// Prints the working directory the invocation came with.
pub struct Pwd;

#[async_trait]
impl Command for Pwd {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn summary(&self) -> &'static str {
        "print the working directory"
    }

    async fn run(&self, invocation: Invocation) -> KernelResult<String> {
        Ok(format!("{}\n", invocation.cwd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::detached_invocation;

    #[tokio::test]
    async fn prints_the_cwd() {
        let mut invocation = detached_invocation(&[]);
        invocation.cwd = "/var/log".to_string();
        assert_eq!(Pwd.run(invocation).await.unwrap(), "/var/log\n");
    }
}
