//! The axis capability contract.
//!
//! An [`Axis`] is any movable or readable device participating in a scan —
//! a motor, a detector exposed as a readable, or a pseudo-device composed of
//! others. The scan engine consumes axes exclusively through this trait;
//! nothing in the crate knows about concrete hardware.
//!
//! # Contract
//!
//! - [`Axis::start_move`] must return promptly; completion is tracked by
//!   polling [`Axis::is_busy`].
//! - [`Axis::move_to`] is the blocking convenience built on top of the
//!   prompt form, and the provided implementation is usually sufficient.
//! - Axes are compared by identity ([`same_axis`]), never by value: the
//!   same `Arc` handle appearing twice in an argument list *is* the same
//!   axis, and two axes that merely share a name are not.

pub mod mock;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to an axis. Cloning the handle does not clone the device.
pub type AxisRef = Arc<dyn Axis>;

/// Default poll interval for the provided busy-wait loop.
const BUSY_POLL: Duration = Duration::from_millis(20);

/// Default timeout for the provided blocking move.
const MOVE_TIMEOUT: Duration = Duration::from_secs(60);

/// A movable or readable device taking part in scans.
#[async_trait]
pub trait Axis: Send + Sync {
    /// Device name, used in command strings, logs and error messages.
    fn name(&self) -> &str;

    /// Whether a previously started move is still in progress.
    async fn is_busy(&self) -> Result<bool>;

    /// Current position of the device's primary field.
    async fn position(&self) -> Result<f64>;

    /// All position fields of the device. Single-field devices use the
    /// provided implementation.
    async fn positions(&self) -> Result<Vec<f64>> {
        Ok(vec![self.position().await?])
    }

    /// Starts a move toward `target` and returns promptly. Completion is
    /// observed through [`Axis::is_busy`].
    async fn start_move(&self, target: f64) -> Result<()>;

    /// Blocking convenience move built atop [`Axis::start_move`].
    async fn move_to(&self, target: f64) -> Result<()> {
        self.start_move(target).await?;
        self.wait_while_busy(MOVE_TIMEOUT).await
    }

    /// Polls [`Axis::is_busy`] until the device settles or `timeout`
    /// elapses.
    async fn wait_while_busy(&self, timeout: Duration) -> Result<()> {
        let deadline = std::time::Instant::now() + timeout;
        while self.is_busy().await? {
            if std::time::Instant::now() >= deadline {
                bail!("timed out waiting for axis '{}' to settle", self.name());
            }
            tokio::time::sleep(BUSY_POLL).await;
        }
        Ok(())
    }
}

/// Identity comparison for axis handles.
pub fn same_axis(a: &AxisRef, b: &AxisRef) -> bool {
    Arc::ptr_eq(a, b)
}
