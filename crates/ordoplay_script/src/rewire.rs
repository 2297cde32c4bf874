// SPDX-License-Identifier: MIT OR Apache-2.0
//! Strategies for carrying links and defaults across a reconstruction.

use crate::pin::Pin;

/// Carry the state of `old_pins[old]` onto `new_pins[new]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinRewire {
    /// Index into the old pin list
    pub old: usize,
    /// Index into the new pin list
    pub new: usize,
}

/// Pair pins that keep their name, direction and a compatible type.
///
/// Each new pin receives at most one old pin.
pub fn match_by_name_and_type(old_pins: &[Pin], new_pins: &[Pin]) -> Vec<PinRewire> {
    let mut taken = vec![false; new_pins.len()];
    let mut plan = Vec::new();

    for (old, old_pin) in old_pins.iter().enumerate() {
        let candidate = new_pins.iter().enumerate().position(|(new, new_pin)| {
            !taken[new]
                && new_pin.direction() == old_pin.direction()
                && new_pin.name() == old_pin.name()
                && carries_over(old_pin, new_pin)
        });
        if let Some(new) = candidate {
            taken[new] = true;
            plan.push(PinRewire { old, new });
        }
    }
    plan
}

/// Pair pins holding the same slot in the same direction, ignoring names.
///
/// Useful for kinds that rename pins when retyped.
pub fn match_by_position(old_pins: &[Pin], new_pins: &[Pin]) -> Vec<PinRewire> {
    old_pins
        .iter()
        .enumerate()
        .filter_map(|(old, old_pin)| {
            new_pins
                .iter()
                .position(|new_pin| {
                    new_pin.direction() == old_pin.direction()
                        && new_pin.pin_index() == old_pin.pin_index()
                        && carries_over(old_pin, new_pin)
                })
                .map(|new| PinRewire { old, new })
        })
        .collect()
}

fn carries_over(old: &Pin, new: &Pin) -> bool {
    if old.is_execution() || new.is_execution() {
        return old.is_execution() && new.is_execution();
    }
    old.value_type() == new.value_type()
        || old.value_type().is_any()
        || new.value_type().is_any()
        || old.value_type().can_connect_to(&new.value_type())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::PinFlags;
    use crate::node::NodeId;
    use crate::pin::PinDirection;
    use crate::value::{Variant, VariantType};

    fn pin(direction: PinDirection, name: &str, ty: VariantType) -> Pin {
        Pin::new(NodeId(1), direction, name, ty, Variant::Nil)
    }

    fn indexed(mut pins: Vec<Pin>) -> Vec<Pin> {
        let (mut inputs, mut outputs) = (0, 0);
        for pin in &mut pins {
            let slot = if pin.is_input() { &mut inputs } else { &mut outputs };
            pin.set_pin_index(*slot);
            *slot += 1;
        }
        pins
    }

    #[test]
    fn test_name_and_type_keeps_surviving_pins() {
        let old = vec![
            pin(PinDirection::Input, "a", VariantType::Int),
            pin(PinDirection::Input, "b", VariantType::Bool),
        ];
        let new = vec![
            pin(PinDirection::Input, "a", VariantType::Int),
            pin(PinDirection::Input, "c", VariantType::String),
        ];

        assert_eq!(match_by_name_and_type(&old, &new), vec![PinRewire { old: 0, new: 0 }]);
    }

    #[test]
    fn test_name_and_type_rejects_retyped_pin() {
        let old = vec![pin(PinDirection::Output, "result", VariantType::Vector3)];
        let new = vec![pin(PinDirection::Output, "result", VariantType::String)];
        assert!(match_by_name_and_type(&old, &new).is_empty());
    }

    #[test]
    fn test_name_and_type_respects_direction() {
        let old = vec![pin(PinDirection::Input, "value", VariantType::Int)];
        let new = vec![pin(PinDirection::Output, "value", VariantType::Int)];
        assert!(match_by_name_and_type(&old, &new).is_empty());
    }

    #[test]
    fn test_execution_pins_pair_only_with_execution_pins() {
        let mut exec = pin(PinDirection::Input, "in", VariantType::Nil);
        exec.set_flags(PinFlags::EXECUTION);
        let old = vec![exec];
        let new = vec![pin(PinDirection::Input, "in", VariantType::Nil)];
        assert!(match_by_name_and_type(&old, &new).is_empty());
    }

    #[test]
    fn test_position_ignores_names() {
        let old = indexed(vec![
            pin(PinDirection::Input, "x", VariantType::Float),
            pin(PinDirection::Output, "out", VariantType::Float),
        ]);
        let new = indexed(vec![
            pin(PinDirection::Input, "first", VariantType::Int),
            pin(PinDirection::Output, "result", VariantType::String),
        ]);

        assert_eq!(match_by_position(&old, &new), vec![PinRewire { old: 0, new: 0 }]);
    }
}
