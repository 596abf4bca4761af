/// The configured set of valid spot ids: `{prefix}{first}` ..= `{prefix}{last}`.
///
/// Only the canonical spelling counts. `A-05` and `A-+5` are not `A-5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotRange {
    prefix: String,
    first: u32,
    last: u32,
}

impl SpotRange {
    pub fn new(prefix: impl Into<String>, first: u32, last: u32) -> Self {
        Self {
            prefix: prefix.into(),
            first,
            last,
        }
    }

    /// Spot number for a canonical, in-range id.
    pub fn parse(&self, id: &str) -> Option<u32> {
        let digits = id.strip_prefix(self.prefix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return None;
        }
        let n: u32 = digits.parse().ok()?;
        (self.first..=self.last).contains(&n).then_some(n)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.parse(id).is_some()
    }

    /// Every valid id, in spot-number order.
    pub fn ids(&self) -> impl Iterator<Item = String> + '_ {
        (self.first..=self.last).map(move |n| format!("{}{}", self.prefix, n))
    }

    pub fn len(&self) -> usize {
        if self.first > self.last {
            0
        } else {
            (self.last - self.first) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
