//! # Frame Publisher
//!
//! Hands the latest head pose and eye matrices from the render thread to
//! anyone else who wants them.
//!
//! ## Plain English Explanation
//!
//! The renderer composes matrices ~90 times per second. Other parts of the
//! host (an overlay, a debug view, a recorder) want to know "what did the
//! headset show last?" without slowing the renderer down.
//!
//! Think of a notice board: the renderer pins up a new sheet each frame,
//! replacing the old one. Readers glance at whatever sheet is up. Nobody
//! waits for anybody for more than a pointer swap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::hmd::{EyePair, HeadPose};
use crate::math::Matrix4;

/// What the headset was shown for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PublishedFrame {
    pub frame_index: u64,
    /// Head pose used for the frame
    pub view_pose: HeadPose,
    /// Eye matrices of the frame's last world call, if it had one
    pub eyes: Option<EyePair<Matrix4>>,
}

/// A cloneable handle to the latest published frame.
///
/// ## Plain English
///
/// Clones share the same board. `publish` replaces the sheet, `latest`
/// takes a look at it.
#[derive(Clone, Default)]
pub struct FramePublisher {
    /// The current sheet. Readers clone the `Arc`, never the frame.
    latest: Arc<RwLock<Option<Arc<PublishedFrame>>>>,

    /// Frames published so far
    published: Arc<AtomicU64>,
}

impl FramePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the published frame and returns the shared copy.
    pub fn publish(&self, frame: PublishedFrame) -> Arc<PublishedFrame> {
        let frame = Arc::new(frame);
        *self.latest.write() = Some(Arc::clone(&frame));
        self.published.fetch_add(1, Ordering::Relaxed);
        frame
    }

    /// The most recent frame, if any was published.
    pub fn latest(&self) -> Option<Arc<PublishedFrame>> {
        self.latest.read().clone()
    }

    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Forgets the current frame, for example after the headset is lost.
    pub fn clear(&self) {
        self.latest.write().take();
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn frame(index: u64) -> PublishedFrame {
        PublishedFrame {
            frame_index: index,
            view_pose: HeadPose::IDENTITY,
            eyes: None,
        }
    }

    #[test]
    fn test_empty_publisher() {
        let publisher = FramePublisher::new();
        assert!(publisher.latest().is_none());
        assert_eq!(publisher.published_count(), 0);
    }

    #[test]
    fn test_latest_wins() {
        let publisher = FramePublisher::new();
        for i in 0..5 {
            publisher.publish(frame(i));
        }
        assert_eq!(publisher.latest().map(|f| f.frame_index), Some(4));
        assert_eq!(publisher.published_count(), 5);

        publisher.clear();
        assert!(publisher.latest().is_none());
        assert_eq!(publisher.published_count(), 5);
    }

    #[test]
    fn test_readers_on_other_threads() {
        let publisher = FramePublisher::new();
        let reader = publisher.clone();

        let writer = thread::spawn(move || {
            for i in 0..100 {
                publisher.publish(frame(i));
            }
        });
        writer.join().unwrap();

        assert_eq!(reader.latest().map(|f| f.frame_index), Some(99));
        assert_eq!(reader.published_count(), 100);
    }

    #[test]
    fn test_held_frame_survives_replacement() {
        let publisher = FramePublisher::new();
        publisher.publish(frame(1));
        let held = publisher.latest();
        publisher.publish(frame(2));
        assert_eq!(held.map(|f| f.frame_index), Some(1));
    }
}
