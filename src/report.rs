use std::fmt::{self, Display};

use crate::FrequencyTable;

/// The console summary of a run: the `n` most frequent fragments, or all of
/// them with a warning header if fewer than `n` qualified
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report<'a> {
    entries: Vec<(&'a str, u32)>,
    n: usize,
    m: i64,
    found: usize,
}

impl<'a> Report<'a> {
    pub fn new(table: &'a FrequencyTable, n: usize, m: i64) -> Self {
        Self {
            entries: table.top(n),
            n,
            m,
            found: table.len(),
        }
    }

    /// the ranked entries shown in the report
    pub fn entries(&self) -> &[(&'a str, u32)] {
        &self.entries
    }

    /// whether fewer than `n` fragments passed the size filter
    pub fn is_short(&self) -> bool {
        self.found < self.n
    }

    pub fn found(&self) -> usize {
        self.found
    }
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_short() {
            writeln!(
                f,
                "Only found {} fragments larger than {} heavy atoms!:",
                self.found, self.m
            )?;
        } else {
            writeln!(
                f,
                "{} most common fragments that have more heavy atoms than {}:",
                self.n, self.m
            )?;
        }
        writeln!(f, "Fragment SMILE, frequency")?;
        for (smiles, count) in &self.entries {
            writeln!(f, "{smiles}: {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FrequencyTable {
        [("A", 3), ("B", 5), ("C", 5), ("D", 1)]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect()
    }

    #[test]
    fn full() {
        let table = table();
        let report = Report::new(&table, 2, 5);
        assert!(!report.is_short());
        assert_eq!(
            report.to_string(),
            "2 most common fragments that have more heavy atoms than 5:\n\
             Fragment SMILE, frequency\n\
             B: 5\n\
             C: 5\n"
        );
    }

    #[test]
    fn short() {
        let table = table();
        let report = Report::new(&table, 10, 0);
        assert!(report.is_short());
        assert_eq!(report.found(), 4);
        assert_eq!(
            report.to_string(),
            "Only found 4 fragments larger than 0 heavy atoms!:\n\
             Fragment SMILE, frequency\n\
             B: 5\n\
             C: 5\n\
             A: 3\n\
             D: 1\n"
        );
    }

    #[test]
    fn empty() {
        let table = FrequencyTable::new();
        let report = Report::new(&table, 10, 5);
        assert!(report.entries().is_empty());
        assert!(report.to_string().starts_with("Only found 0 fragments"));
    }
}
