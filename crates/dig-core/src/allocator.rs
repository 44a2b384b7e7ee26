//! DIG encoder slot allocation
//!
//! Two physical encoders serve up to three outputs. The dedicated LVTMA
//! output is hardwired to DIG2; the shared UNIPHY outputs prefer DIG1 and
//! fall back to DIG2.

use dig_hw::{EncoderSlot, OutputId};
use tracing::{debug, info, warn};

use crate::error::DigError;
use crate::state::OutputHandle;

/// Slot bookkeeping events, drained by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotEvent {
    /// A slot was granted to an output
    Assigned {
        slot: EncoderSlot,
        handle: OutputHandle,
        output: OutputId,
    },
    /// An output gave its slot back
    Released {
        slot: EncoderSlot,
        handle: OutputHandle,
    },
    /// An allocation failed because the slots it may use are taken
    Contention {
        handle: OutputHandle,
        output: OutputId,
    },
}

/// Ownership table for the two DIG encoder slots
#[derive(Debug, Default)]
pub struct SlotAllocator {
    owners: [Option<OutputHandle>; 2],
    event_buffer: Vec<SlotEvent>,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current owner of a slot
    pub fn owner(&self, slot: EncoderSlot) -> Option<OutputHandle> {
        self.owners[slot.index()]
    }

    /// Slot currently held by `handle`
    pub fn slot_of(&self, handle: OutputHandle) -> Option<EncoderSlot> {
        EncoderSlot::ALL
            .into_iter()
            .find(|slot| self.owner(*slot) == Some(handle))
    }

    /// Whether `slot` is held by an output other than `handle`
    pub fn taken_by_other(&self, slot: EncoderSlot, handle: OutputHandle) -> bool {
        matches!(self.owner(slot), Some(owner) if owner != handle)
    }

    /// Grant a slot to an output
    ///
    /// Idempotent: an output that already holds a slot gets the same one back.
    pub fn allocate(
        &mut self,
        handle: OutputHandle,
        output: OutputId,
    ) -> Result<EncoderSlot, DigError> {
        if let Some(slot) = self.slot_of(handle) {
            debug!("{} ({}) already holds {}", output, handle, slot);
            return Ok(slot);
        }

        let candidates: &[EncoderSlot] = if output.is_dedicated() {
            &[EncoderSlot::Dig2]
        } else {
            &EncoderSlot::ALL
        };

        match candidates.iter().copied().find(|s| self.owner(*s).is_none()) {
            Some(slot) => {
                self.owners[slot.index()] = Some(handle);
                info!("Mapping {} encoder to {}", slot, output);
                self.event_buffer.push(SlotEvent::Assigned {
                    slot,
                    handle,
                    output,
                });
                Ok(slot)
            }
            None => {
                warn!("no free encoder for {} ({})", output, handle);
                self.event_buffer.push(SlotEvent::Contention { handle, output });
                let held = match candidates {
                    [only] => self.owner(*only).map(|owner| (*only, owner)),
                    _ => None,
                };
                Err(DigError::ResourceUnavailable { output, held })
            }
        }
    }

    /// Release whatever slot `handle` holds
    ///
    /// Only entries that reference `handle` are cleared, so a stale free can
    /// never evict a later owner.
    pub fn free(&mut self, handle: OutputHandle) -> Option<EncoderSlot> {
        let slot = self.slot_of(handle)?;
        self.owners[slot.index()] = None;
        debug!("Released {} from {}", slot, handle);
        self.event_buffer.push(SlotEvent::Released { slot, handle });
        Some(slot)
    }

    /// Take buffered events
    pub fn drain_events(&mut self) -> Vec<SlotEvent> {
        std::mem::take(&mut self.event_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: OutputHandle = OutputHandle(1);
    const B: OutputHandle = OutputHandle(2);
    const L: OutputHandle = OutputHandle(3);

    #[test]
    fn test_shared_outputs_fill_dig1_then_dig2() {
        let mut slots = SlotAllocator::new();
        assert_eq!(slots.allocate(A, OutputId::UniphyA).unwrap(), EncoderSlot::Dig1);
        assert_eq!(slots.allocate(B, OutputId::UniphyB).unwrap(), EncoderSlot::Dig2);
    }

    #[test]
    fn test_dedicated_output_only_takes_dig2() {
        let mut slots = SlotAllocator::new();
        assert_eq!(slots.allocate(L, OutputId::Lvtma).unwrap(), EncoderSlot::Dig2);
        assert_eq!(slots.owner(EncoderSlot::Dig1), None);
    }

    #[test]
    fn test_dedicated_output_fails_when_dig2_held() {
        let mut slots = SlotAllocator::new();
        slots.allocate(A, OutputId::UniphyA).unwrap();
        slots.allocate(B, OutputId::UniphyB).unwrap();

        let err = slots.allocate(L, OutputId::Lvtma).unwrap_err();
        assert_eq!(
            err,
            DigError::ResourceUnavailable {
                output: OutputId::Lvtma,
                held: Some((EncoderSlot::Dig2, B)),
            }
        );
        assert_eq!(slots.owner(EncoderSlot::Dig1), Some(A));
    }

    #[test]
    fn test_allocate_is_idempotent() {
        let mut slots = SlotAllocator::new();
        let first = slots.allocate(A, OutputId::UniphyA).unwrap();
        let second = slots.allocate(A, OutputId::UniphyA).unwrap();
        assert_eq!(first, second);
        assert_eq!(slots.owner(EncoderSlot::Dig2), None);
        assert_eq!(slots.drain_events().len(), 1);
    }

    #[test]
    fn test_free_only_clears_own_entry() {
        let mut slots = SlotAllocator::new();
        slots.allocate(A, OutputId::UniphyA).unwrap();

        assert_eq!(slots.free(B), None);
        assert_eq!(slots.owner(EncoderSlot::Dig1), Some(A));

        assert_eq!(slots.free(A), Some(EncoderSlot::Dig1));
        assert_eq!(slots.free(A), None);
    }

    #[test]
    fn test_events() {
        let mut slots = SlotAllocator::new();
        slots.allocate(L, OutputId::Lvtma).unwrap();
        slots.allocate(A, OutputId::UniphyA).unwrap();
        let _ = slots.allocate(B, OutputId::UniphyB);
        slots.free(L);

        assert_eq!(
            slots.drain_events(),
            vec![
                SlotEvent::Assigned {
                    slot: EncoderSlot::Dig2,
                    handle: L,
                    output: OutputId::Lvtma
                },
                SlotEvent::Assigned {
                    slot: EncoderSlot::Dig1,
                    handle: A,
                    output: OutputId::UniphyA
                },
                SlotEvent::Contention {
                    handle: B,
                    output: OutputId::UniphyB
                },
                SlotEvent::Released {
                    slot: EncoderSlot::Dig2,
                    handle: L
                },
            ]
        );
        assert!(slots.drain_events().is_empty());
    }
}
