/// Tracks the largest and second-largest distinct values of a stream.
///
/// Constant memory: two slots, whatever the stream length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondMaxTracker<T> {
    max: Option<T>,
    second: Option<T>,
}

impl<T> Default for SecondMaxTracker<T> {
    fn default() -> Self {
        Self {
            max: None,
            second: None,
        }
    }
}

impl<T: Ord + Copy> SecondMaxTracker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one value.
    ///
    /// A new maximum demotes the old one to second place. Values equal to
    /// the current maximum change nothing.
    pub fn observe(&mut self, value: T) {
        match self.max {
            None => self.max = Some(value),
            Some(max) if value > max => {
                self.second = Some(max);
                self.max = Some(value);
            }
            Some(max) if value < max => {
                if self.second.is_none_or(|second| value > second) {
                    self.second = Some(value);
                }
            }
            Some(_) => {}
        }
    }

    pub fn max(&self) -> Option<T> {
        self.max
    }

    /// Second-largest distinct value, if at least two were seen.
    pub fn second_max(&self) -> Option<T> {
        self.second
    }
}

impl<T: Ord + Copy> Extend<T> for SecondMaxTracker<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.observe(value);
        }
    }
}
