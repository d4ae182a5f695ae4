/// Which sheet a session works on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SheetSelector {
    /// The grid's first sheet.
    #[default]
    First,
    Name(String),
    /// 0-based position in the grid's sheet order.
    Index(usize),
}

/// What to do when a single cell fails to convert.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ConversionPolicy {
    /// Abort the call with the error; the target is left untouched.
    #[default]
    Strict,
    /// Keep the field's zero value, count the cell in
    /// [`OperationResult::skipped`] and carry on.
    Lenient,
}

#[derive(Clone, Debug)]
pub struct ReadOptions {
    pub sheet: SheetSelector,
    /// A1 reference of the header cell (the top-left of the table).
    pub origin: String,
    pub policy: ConversionPolicy,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            sheet: SheetSelector::First,
            origin: "A1".to_string(),
            policy: ConversionPolicy::Strict,
        }
    }
}

impl ReadOptions {
    pub fn with_sheet(mut self, name: impl Into<String>) -> Self {
        self.sheet = SheetSelector::Name(name.into());
        self
    }

    pub fn with_sheet_index(mut self, index: usize) -> Self {
        self.sheet = SheetSelector::Index(index);
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Clone, Debug)]
pub struct WriteOptions {
    pub sheet: SheetSelector,
    /// A1 reference of the header cell (the top-left of the table).
    pub origin: String,
    pub policy: ConversionPolicy,
    /// Create a sheet selected by name when the grid lacks it.
    pub create_missing_sheet: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            sheet: SheetSelector::First,
            origin: "A1".to_string(),
            policy: ConversionPolicy::Strict,
            create_missing_sheet: false,
        }
    }
}

impl WriteOptions {
    pub fn with_sheet(mut self, name: impl Into<String>) -> Self {
        self.sheet = SheetSelector::Name(name.into());
        self
    }

    pub fn with_sheet_index(mut self, index: usize) -> Self {
        self.sheet = SheetSelector::Index(index);
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn create_missing_sheet(mut self, create: bool) -> Self {
        self.create_missing_sheet = create;
        self
    }
}

/// Outcome of one unmarshal/marshal call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationResult {
    /// Data rows decoded or written (the header row is not counted).
    pub rows: usize,
    /// Header width on read; mapped columns on write.
    pub columns: usize,
    /// Cells left at their zero value under [`ConversionPolicy::Lenient`].
    pub skipped: usize,
}
