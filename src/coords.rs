use serde::Deserialize;
use serde::Serialize;

/// Grid coordinates for the hexagon tiling.
/// `x` selects a column of hexes, `y` counts half-rows: moving to a direct
/// neighbor changes `y` by 1 or 2, so two cells of the same column are 2
/// apart in `y` and diagonal neighbors are 1 apart in both axes.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Grows towards the right
    x: i16,

    /// Grows towards the bottom
    y: i16,
}

/// The three orientations a column marker may take.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    BottomRight,
    Bottom,
    BottomLeft,
}

impl Orientation {
    /// Rotation of the marker glyph, in degrees.
    pub fn angle(self) -> i32 {
        match self {
            Orientation::BottomRight => -60,
            Orientation::Bottom => 0,
            Orientation::BottomLeft => 60,
        }
    }

    pub fn of_angle(angle: i32) -> Option<Orientation> {
        match angle {
            -60 => Some(Orientation::BottomRight),
            0 => Some(Orientation::Bottom),
            60 => Some(Orientation::BottomLeft),
            _ => None,
        }
    }

    /// The half-row step taken when walking the column's member ray.
    pub fn step(self) -> (isize, isize) {
        match self {
            Orientation::BottomRight => (1, 1),
            Orientation::Bottom => (0, 1),
            Orientation::BottomLeft => (-1, 1),
        }
    }
}

impl Coord {
    pub fn new(x: isize, y: isize) -> Coord {
        use std::convert::TryInto;
        Coord {
            x: x.try_into().unwrap(),
            y: y.try_into().unwrap(),
        }
    }

    pub fn x(&self) -> isize {
        self.x.into()
    }
    pub fn y(&self) -> isize {
        self.y.into()
    }

    /// Returns the coordinates of the 6 direct neighbors, ordered clockwise starting from north.
    pub fn neighbors6(&self) -> [Coord; 6] {
        let (x, y) = (self.x(), self.y());
        [
            Coord::new(x, y - 2),     // north
            Coord::new(x + 1, y - 1), // north-east
            Coord::new(x + 1, y + 1), // south-east
            Coord::new(x, y + 2),     // south
            Coord::new(x - 1, y + 1), // south-west
            Coord::new(x - 1, y - 1), // north-west
        ]
    }

    /// Returns the coordinates of the 18-cell flower neighborhood (the
    /// two-ring), ordered clockwise starting from north, inner ring first on
    /// angular ties.
    pub fn neighbors18(&self) -> [Coord; 18] {
        let (x, y) = (self.x(), self.y());
        [
            Coord::new(x, y - 2),
            Coord::new(x, y - 4),
            Coord::new(x + 1, y - 3),
            Coord::new(x + 1, y - 1),
            Coord::new(x + 2, y - 2),
            Coord::new(x + 2, y),
            Coord::new(x + 1, y + 1),
            Coord::new(x + 2, y + 2),
            Coord::new(x + 1, y + 3),
            Coord::new(x, y + 2),
            Coord::new(x, y + 4),
            Coord::new(x - 1, y + 3),
            Coord::new(x - 1, y + 1),
            Coord::new(x - 2, y + 2),
            Coord::new(x - 2, y),
            Coord::new(x - 1, y - 1),
            Coord::new(x - 2, y - 2),
            Coord::new(x - 1, y - 3),
        ]
    }

    /// Whether `other` is one of the 6 direct neighbors.
    pub fn is_neighbor(&self, other: &Coord) -> bool {
        let dx = other.x() - self.x();
        let dy = other.y() - self.y();
        match (dx, dy) {
            (0, -2) | (0, 2) => true,
            (1, -1) | (1, 1) | (-1, 1) | (-1, -1) => true,
            _ => false,
        }
    }

    pub fn translate(&self, dx: isize, dy: isize) -> Coord {
        Coord::new(self.x() + dx, self.y() + dy)
    }
}

impl std::ops::Add for Coord {
    type Output = Coord;
    fn add(self, other: Coord) -> Coord {
        Coord::new(self.x() + other.x(), self.y() + other.y())
    }
}

impl std::ops::Sub for Coord {
    type Output = Coord;
    fn sub(self, other: Coord) -> Coord {
        Coord::new(self.x() - other.x(), self.y() - other.y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_neighbors6() {
        let c = Coord::new(4, 8);
        let ns = c.neighbors6();
        assert_eq!(ns.len(), 6);
        for n in &ns {
            assert!(c.is_neighbor(n));
            assert!(n.is_neighbor(&c));
        }
        // Clockwise from north
        assert_eq!(ns[0], Coord::new(4, 6));
        assert_eq!(ns[3], Coord::new(4, 10));
        // Horizontal "neighbors" are two columns away and not adjacent
        assert!(!c.is_neighbor(&Coord::new(6, 8)));
        assert!(!c.is_neighbor(&c));
    }

    #[test]
    pub fn test_neighbors18() {
        let c = Coord::new(0, 0);
        let flower = c.neighbors18();
        assert_eq!(flower.len(), 18);
        // The inner ring is a subset of the flower
        for n in c.neighbors6() {
            assert!(flower.contains(&n));
        }
        // No duplicates
        for (i, a) in flower.iter().enumerate() {
            for b in &flower[i + 1..] {
                assert_ne!(a, b);
            }
        }
        // Every flower cell is within two steps of the center
        for n in &flower {
            assert!(n.x().abs() <= 2 && n.y().abs() <= 4);
        }
    }

    #[test]
    pub fn test_column_steps() {
        assert_eq!(Orientation::Bottom.step(), (0, 1));
        assert_eq!(Orientation::BottomRight.step(), (1, 1));
        assert_eq!(Orientation::BottomLeft.step(), (-1, 1));
        assert_eq!(Orientation::of_angle(-60), Some(Orientation::BottomRight));
        assert_eq!(Orientation::of_angle(90), None);
        // Walking two Bottom steps from a cell slot lands on the cell below it
        let c = Coord::new(3, 3);
        let (dx, dy) = Orientation::Bottom.step();
        let below = c.translate(dx * 2, dy * 2);
        assert!(c.is_neighbor(&below));
    }

    #[test]
    pub fn test_arith() {
        let a = Coord::new(2, 3);
        let b = Coord::new(-1, 5);
        assert_eq!(a + b, Coord::new(1, 8));
        assert_eq!(a - b, Coord::new(3, -2));
    }
}
