//! Frame lifecycle state machine
//!
//! `Idle -> FrameStarted -> FrameEnded -> Idle`. Beginning a frame waits on
//! the current slot's fence before anything touches that slot's command or
//! uniform buffer, and only then acquires an image and resets the fence.
//! Ending a frame submits, presents and advances the slot index. Once the
//! caller has dealt with the present result it finishes the frame, returning
//! the sequencer to `Idle`.

use super::api::{AcquireOutcome, GpuDevice, PresentOutcome};
use super::error::{RenderError, RenderResult};
use super::presentation::PresentationSurface;

/// Frame sequencer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No frame has been started since the last one was presented
    Idle,
    /// A frame is being recorded
    FrameStarted,
    /// The last frame was submitted and presented but not yet finished
    FrameEnded,
}

/// What a started frame records into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext<C> {
    /// Frame slot index
    pub slot: usize,
    /// Acquired presentable image
    pub image_index: u32,
    /// Command buffer in the recording state
    pub command_buffer: C,
    /// The image was acquired from a suboptimal surface
    pub suboptimal: bool,
}

/// Drives begin/end of frames over a fixed ring of frame slots
#[derive(Debug)]
pub struct FrameSequencer {
    state: FrameState,
    current_slot: usize,
    image_index: u32,
    frames_in_flight: usize,
    frame_number: u64,
}

impl FrameSequencer {
    /// Sequencer over `frames_in_flight` slots, starting at slot 0
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            state: FrameState::Idle,
            current_slot: 0,
            image_index: 0,
            frames_in_flight: frames_in_flight.max(1),
            frame_number: 0,
        }
    }

    /// Current state
    pub const fn state(&self) -> FrameState {
        self.state
    }

    /// Slot the next (or current) frame uses
    pub const fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Number of slots in the ring
    pub const fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Frames presented so far
    pub const fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// True while a frame is being recorded
    pub fn is_frame_started(&self) -> bool {
        self.state == FrameState::FrameStarted
    }

    /// Start a frame.
    ///
    /// Returns `Ok(None)` if the surface is out of date; the sequencer is then
    /// left exactly as it was and the caller must rebuild the surface.
    pub fn begin_frame<D: GpuDevice>(
        &mut self,
        device: &D,
        surface: &mut PresentationSurface<D>,
    ) -> RenderResult<Option<FrameContext<D::CommandBuffer>>> {
        if self.state == FrameState::FrameStarted {
            return Err(RenderError::FrameAlreadyInProgress);
        }
        let slot = self.current_slot;

        surface.wait_for_slot(device, slot)?;

        let (image_index, suboptimal) = match surface.acquire_next_image(device, slot)? {
            AcquireOutcome::Acquired { image_index, suboptimal } => (image_index, suboptimal),
            AcquireOutcome::OutOfDate => {
                log::debug!("Acquire reported an out-of-date surface on slot {slot}");
                return Ok(None);
            }
        };

        // Only reset once work is guaranteed to be submitted with this fence
        surface.reset_slot(device, slot)?;

        let command_buffer = surface.command_buffer(slot)?;
        device
            .begin_commands(command_buffer)
            .map_err(RenderError::RenderSubmission)?;

        self.state = FrameState::FrameStarted;
        self.image_index = image_index;
        log::trace!("Frame {} started: slot {slot}, image {image_index}", self.frame_number);

        Ok(Some(FrameContext {
            slot,
            image_index,
            command_buffer,
            suboptimal,
        }))
    }

    /// Finish recording, submit, present and advance to the next slot
    pub fn end_frame<D: GpuDevice>(
        &mut self,
        device: &D,
        surface: &PresentationSurface<D>,
    ) -> RenderResult<PresentOutcome> {
        if self.state != FrameState::FrameStarted {
            return Err(RenderError::FrameNotInProgress);
        }
        let slot = self.current_slot;

        let command_buffer = surface.command_buffer(slot)?;
        device
            .end_commands(command_buffer)
            .map_err(RenderError::RenderSubmission)?;

        let outcome = surface.submit_and_present(device, slot, self.image_index)?;

        self.state = FrameState::FrameEnded;
        self.current_slot = (slot + 1) % self.frames_in_flight;
        self.frame_number += 1;
        log::trace!("Frame presented on slot {slot} with {outcome:?}");
        Ok(outcome)
    }

    /// Return to `Idle` after an ended frame. No effect in any other state.
    pub fn finish_frame(&mut self) {
        if self.state == FrameState::FrameEnded {
            self.state = FrameState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sequencer_is_idle_on_slot_zero() {
        let sequencer = FrameSequencer::new(2);
        assert_eq!(sequencer.state(), FrameState::Idle);
        assert_eq!(sequencer.current_slot(), 0);
        assert!(!sequencer.is_frame_started());
    }

    #[test]
    fn finishing_without_an_ended_frame_keeps_the_state() {
        let mut sequencer = FrameSequencer::new(2);
        sequencer.finish_frame();
        assert_eq!(sequencer.state(), FrameState::Idle);
        assert_eq!(sequencer.frame_number(), 0);
    }

    #[test]
    fn zero_slots_are_clamped_to_one() {
        assert_eq!(FrameSequencer::new(0).frames_in_flight(), 1);
    }
}
