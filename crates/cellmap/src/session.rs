use crate::container::{Element, Layout};
use crate::error::{ConfigError, Error, FieldError};
use crate::options::{ConversionPolicy, OperationResult, SheetSelector};
use cellmap_common::CellRef;
use cellmap_workbook::GridReader;
use rustc_hash::FxHashMap;
use std::any::TypeId;
use std::sync::Arc;

/// Validated sheet + origin of one call.
#[derive(Clone, Debug)]
pub(crate) struct Target {
    pub(crate) sheet: String,
    pub(crate) origin: CellRef,
}

impl Target {
    pub(crate) fn resolve<G: GridReader>(
        grid: &G,
        selector: &SheetSelector,
        origin: &str,
    ) -> Result<Self, Error> {
        let origin = parse_origin(origin)?;
        let names = grid.sheet_names().map_err(Error::grid)?;
        let sheet = match selector {
            SheetSelector::First => names.into_iter().next().ok_or(ConfigError::NoSheets)?,
            SheetSelector::Index(index) => {
                let count = names.len();
                names
                    .into_iter()
                    .nth(*index)
                    .ok_or(ConfigError::SheetIndexOutOfRange {
                        index: *index,
                        count,
                    })?
            }
            SheetSelector::Name(name) => {
                if !names.iter().any(|n| n == name) {
                    return Err(ConfigError::SheetNotFound(name.clone()).into());
                }
                name.clone()
            }
        };
        Ok(Self { sheet, origin })
    }

    /// A named sheet the caller will create before writing.
    pub(crate) fn pending(sheet: &str, origin: &str) -> Result<Self, Error> {
        Ok(Self {
            sheet: sheet.to_string(),
            origin: parse_origin(origin)?,
        })
    }
}

fn parse_origin(origin: &str) -> Result<CellRef, Error> {
    CellRef::parse_a1(origin).map_err(|source| {
        Error::from(ConfigError::InvalidOrigin {
            origin: origin.to_string(),
            source,
        })
    })
}

/// Layouts built so far in one session, one per element type.
#[derive(Default)]
pub(crate) struct LayoutCache {
    layouts: FxHashMap<TypeId, Arc<Layout>>,
}

impl LayoutCache {
    pub(crate) fn get<E: Element>(&mut self) -> Arc<Layout> {
        self.layouts
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Arc::new(E::layout()))
            .clone()
    }
}

impl ConversionPolicy {
    /// Decide whether a per-cell failure ends the call. Only conversion
    /// failures are ever tolerated.
    pub(crate) fn settle(
        self,
        row: u32,
        target: &str,
        err: FieldError,
        result: &mut OperationResult,
    ) -> Result<(), Error> {
        match (self, err) {
            (ConversionPolicy::Lenient, FieldError::Convert(_source)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(row, column = target, error = %_source, "cell skipped");
                result.skipped += 1;
                Ok(())
            }
            (_, err) => Err(Error::at(row, target, err)),
        }
    }
}
