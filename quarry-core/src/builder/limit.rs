use crate::{MappingError, Result, SqlWriter};

/// How `take` is interpreted.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitMode {
    /// `take` rows after `skip`.
    #[default]
    Rows,
    /// `take` rows plus the ones tied with the last on the sort key.
    RowsWithTies,
    /// `take` percent of the rows.
    Percentage,
    PercentageWithTies,
    /// Block sampling returning about `take` rows.
    TableSampleSystemRows,
    /// Block sampling returning about `take` percent of the rows.
    TableSampleSystemPercentage,
    /// Row sampling returning about `take` percent of the rows.
    TableSampleBernoulliPercentage,
    /// `take` rows picked in random order.
    RandomSampleRows,
}

impl LimitMode {
    pub fn with_ties(&self) -> bool {
        matches!(self, Self::RowsWithTies | Self::PercentageWithTies)
    }
    pub fn is_table_sample(&self) -> bool {
        matches!(
            self,
            Self::TableSampleSystemRows
                | Self::TableSampleSystemPercentage
                | Self::TableSampleBernoulliPercentage
        )
    }
    /// Sampling modes pick rows by chance, an explicit sort makes no sense with them.
    pub fn is_sample(&self) -> bool {
        self.is_table_sample() || *self == Self::RandomSampleRows
    }
    pub fn is_percentage(&self) -> bool {
        matches!(
            self,
            Self::Percentage
                | Self::PercentageWithTies
                | Self::TableSampleSystemPercentage
                | Self::TableSampleBernoulliPercentage
        )
    }
}

/// Abstract paging or sampling request, rendered by each dialect with its own idiom.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limit {
    pub skip: Option<u64>,
    pub take: Option<u64>,
    pub mode: LimitMode,
    /// Seed for repeatable sampling.
    pub seed: Option<u64>,
}

impl Limit {
    pub fn take(take: u64) -> Self {
        Self {
            take: Some(take),
            ..Default::default()
        }
    }
    pub fn skip(skip: u64) -> Self {
        Self {
            skip: Some(skip),
            ..Default::default()
        }
    }
    pub fn page(skip: u64, take: u64) -> Self {
        Self {
            skip: Some(skip),
            take: Some(take),
            ..Default::default()
        }
    }
    pub fn mode(mode: LimitMode, take: u64) -> Self {
        Self {
            take: Some(take),
            mode,
            ..Default::default()
        }
    }
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Rejects combinations the dialect cannot render, before any SQL is written.
    pub fn validate(&self, writer: &dyn SqlWriter, explicit_sort: bool) -> Result<()> {
        let dialect = writer.dialect();
        if !writer.supports_limit(self.mode) {
            return Err(MappingError::configuration(format!(
                "{dialect} does not support the limit mode {:?}",
                self.mode
            ))
            .into());
        }
        if self.take.is_none() && self.mode != LimitMode::Rows {
            return Err(MappingError::configuration(format!(
                "The limit mode {:?} requires a value",
                self.mode
            ))
            .into());
        }
        if self.skip.is_some() && (self.mode != LimitMode::Rows || !writer.supports_skip()) {
            return Err(MappingError::configuration(format!(
                "{dialect} cannot skip rows with the limit mode {:?}",
                self.mode
            ))
            .into());
        }
        if self.mode.is_percentage() && self.take.is_some_and(|v| v > 100) {
            return Err(MappingError::configuration(format!(
                "A percentage limit cannot exceed 100, got {}",
                self.take.unwrap_or_default()
            ))
            .into());
        }
        if self.mode.with_ties() && !explicit_sort {
            return Err(MappingError::configuration(format!(
                "The limit mode {:?} requires an explicit sort",
                self.mode
            ))
            .into());
        }
        if self.mode.is_sample() && explicit_sort {
            return Err(MappingError::configuration(format!(
                "The limit mode {:?} cannot be combined with an explicit sort",
                self.mode
            ))
            .into());
        }
        if self.seed.is_some() && !writer.supports_seed(self.mode) {
            return Err(MappingError::configuration(format!(
                "{dialect} does not support a repeatable seed with the limit mode {:?}",
                self.mode
            ))
            .into());
        }
        Ok(())
    }

    /// Paging that needs a deterministic order to be repeatable.
    pub fn needs_order(&self) -> bool {
        !self.mode.is_sample() && !self.mode.with_ties()
    }
}
