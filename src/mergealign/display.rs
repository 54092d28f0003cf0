use std::fmt::Display;

use super::{graph::Edge, Coordinates};

impl Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;

        let mut once = true;
        for offset in self.offsets() {
            if once {
                once = false;
            } else {
                write!(f, ", ")?;
            }

            write!(f, "{offset}")?;
        }

        write!(f, ")")
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Edge[{} x{}]", self.predecessor, self.count)
    }
}
