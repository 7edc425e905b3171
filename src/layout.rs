//! Pin placement along node borders.
//!
//! Outputs hang off the right border and inputs off the left border. The
//! k-th pin of a direction (1-based) sits at `height / (count + 1) * k`, so
//! pins of each side are spread evenly whatever the node height.

use crate::geometry::{Point, Size};
use crate::node_type::PinDirection;

/// Offsets of every pin relative to the node's top-left corner, in pin order.
///
/// # Arguments
/// * `directions` - Direction of each pin, in declaration order
/// * `node_size` - Current node size
/// * `pin_size` - Size of a pin box
pub fn layout_pins<I>(directions: I, node_size: Size, pin_size: Size) -> Vec<Point>
where
    I: IntoIterator<Item = PinDirection>,
    I::IntoIter: Clone,
{
    let directions = directions.into_iter();
    let outputs = directions.clone().filter(|d| *d == PinDirection::Output).count();
    let inputs = directions.clone().count() - outputs;

    let mut next_output = 1;
    let mut next_input = 1;
    directions
        .map(|direction| match direction {
            PinDirection::Output => {
                let y = node_size.height / (outputs + 1) as f32 * next_output as f32;
                next_output += 1;
                Point::new(node_size.width - 1.0, y)
            }
            PinDirection::Input => {
                let y = node_size.height / (inputs + 1) as f32 * next_input as f32;
                next_input += 1;
                Point::new(-pin_size.width - 1.0, y)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIN: Size = Size::new(10.0, 10.0);

    #[test]
    fn test_single_pins_centered() {
        let offsets = layout_pins(
            [PinDirection::Input, PinDirection::Output],
            Size::new(100.0, 100.0),
            PIN,
        );
        assert_eq!(offsets, vec![Point::new(-11.0, 50.0), Point::new(99.0, 50.0)]);
    }

    #[test]
    fn test_sides_spread_independently() {
        let offsets = layout_pins(
            [
                PinDirection::Input,
                PinDirection::Input,
                PinDirection::Output,
                PinDirection::Input,
            ],
            Size::new(80.0, 120.0),
            PIN,
        );
        assert_eq!(offsets[0].y, 30.0);
        assert_eq!(offsets[1].y, 60.0);
        assert_eq!(offsets[2], Point::new(79.0, 60.0));
        assert_eq!(offsets[3].y, 90.0);
    }

    #[test]
    fn test_no_pins() {
        assert!(layout_pins(Vec::<PinDirection>::new(), Size::new(10.0, 10.0), PIN).is_empty());
    }
}
