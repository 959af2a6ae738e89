/// Part of the statement being written, decides how column names are qualified.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    #[default]
    None,
    SqlDeleteFrom,
    SqlDeleteFromWhere,
    SqlInsertInto,
    SqlInsertIntoExcluded,
    SqlInsertIntoOnConflict,
    SqlInsertIntoValues,
    SqlMergeSource,
    SqlMergeTarget,
    SqlOutputDeleted,
    SqlOutputInserted,
    SqlSelect,
    SqlSelectFrom,
    SqlSelectOrderBy,
    SqlSelectWhere,
    SqlUpdate,
    SqlUpdateSet,
    SqlUpdateWhere,
}

impl Fragment {
    /// Qualifier written before column names in this fragment.
    pub fn qualifier(&self) -> Option<&'static str> {
        match self {
            Fragment::SqlInsertIntoExcluded => Some("EXCLUDED"),
            Fragment::SqlMergeSource => Some("source"),
            Fragment::SqlMergeTarget => Some("target"),
            Fragment::SqlOutputDeleted => Some("Deleted"),
            Fragment::SqlOutputInserted => Some("Inserted"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// Positional parameters written so far.
    pub counter: u32,
    pub fragment: Fragment,
}

impl Context {
    pub fn new(fragment: Fragment) -> Self {
        Self {
            counter: 0,
            fragment,
        }
    }
    pub fn update_from(&mut self, context: &Context) {
        self.counter = context.counter;
    }
    pub fn switch_fragment<'s>(&'s mut self, fragment: Fragment) -> ContextUpdater<'s> {
        ContextUpdater {
            current: Context { fragment, ..*self },
            previous: self,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(Fragment::None)
    }
}

/// Temporary context for a fragment, propagates the parameter counter back on drop.
pub struct ContextUpdater<'a> {
    pub current: Context,
    pub previous: &'a mut Context,
}

impl<'a> Drop for ContextUpdater<'a> {
    fn drop(&mut self) {
        self.previous.counter = self.current.counter;
    }
}
