//! Table lookup from CSV data.
//!
//! Tables are read in `initialize`, either from the file named by
//! `filename` or from the inline `text` parameter when that is non-empty.
//! Unreadable or malformed data is reported on the message queue and stops
//! the simulation before the first step.

use crate::common::signal_handle;
use crate::configure::{Configurator, PortIdx};
use crate::context::SimContext;
use crate::error::ComponentResult;
use crate::parameter::ParamIdx;
use crate::traits::Component;
use std::path::Path;
use tlm_graph::{CqsType, SlotHandle};
use tlm_utilities::{CsvData, CsvOptions, LookupTable1D, LookupTable2D};

/// CSV source parameters shared by the lookup components.
#[derive(Debug, Default)]
struct CsvSource {
    filename: ParamIdx,
    text: ParamIdx,
    separator: ParamIdx,
    skip_lines: ParamIdx,
    comment: ParamIdx,
}

fn single_char(text: &str, problem: &str) -> Result<char, String> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(problem.to_string()),
    }
}

impl CsvSource {
    fn configure(&mut self, cfg: &mut Configurator) {
        self.filename = cfg.add_text_parameter("filename", "Data file", "");
        self.text = cfg.add_text_parameter("text", "Text input (instead of file)", "");
        self.separator = cfg.add_text_parameter("csvsep", "csv separator character", ",");
        self.skip_lines =
            cfg.add_parameter("numlineskip", "The number of lines to skip (from the top)", "", 0.0);
        self.comment =
            cfg.add_text_parameter("comment", "Skip lines starting with character", "");
    }

    /// What the data was read from, for messages.
    fn origin<'a>(&self, ctx: &SimContext<'a>) -> &'a str {
        if ctx.param_text(self.text).is_empty() {
            ctx.param_text(self.filename)
        } else {
            "text input"
        }
    }

    fn load(&self, ctx: &SimContext<'_>) -> Result<CsvData, String> {
        let separator = single_char(
            ctx.param_text(self.separator),
            "Separator character must be ONE character",
        )?;
        let comment = match ctx.param_text(self.comment) {
            "" => None,
            c => Some(single_char(c, "Comment character must be one character")?),
        };
        let options = CsvOptions {
            separator,
            skip_lines: ctx.param(self.skip_lines).max(0.0) as usize,
            comment,
        };
        let text = ctx.param_text(self.text);
        if text.is_empty() {
            let file = ctx.param_text(self.filename);
            CsvData::read(Path::new(file), &options)
                .map_err(|e| format!("Unable to initialize CSV file: {file}, {e}"))
        } else {
            CsvData::parse(text, &options).map_err(|e| format!("Unable to initialize CSV parser: {e}"))
        }
    }
}

fn fail(ctx: &SimContext<'_>, message: &str) {
    ctx.add_error_message(message);
    ctx.stop_simulation("");
}

/// `out = table(in)`, linear between rows and clamped outside the index range.
#[derive(Debug, Default)]
pub struct Signal1DLookupTable {
    input: PortIdx,
    out: PortIdx,
    source: CsvSource,
    in_column: ParamIdx,
    out_column: ParamIdx,
    table: LookupTable1D,
    handles: Option<(SlotHandle, SlotHandle)>,
}

impl Signal1DLookupTable {
    fn load_table(&self, ctx: &SimContext<'_>) -> Result<LookupTable1D, String> {
        let data = self.source.load(ctx)?;
        let (in_id, out_id) = (ctx.param(self.in_column), ctx.param(self.out_column));
        let num_cols = data.max_cols() as f64;
        if !(0.0..num_cols).contains(&in_id) || !(0.0..num_cols).contains(&out_id) {
            return Err(format!("inid: {in_id} or outid: {out_id} is out of range!"));
        }
        let (Ok(index), Ok(values)) = (data.column(in_id as usize), data.column(out_id as usize))
        else {
            return Err("There were parsing errors in either the input or output data columns".into());
        };
        LookupTable1D::new(index, values).map_err(|e| {
            format!(
                "The LookupTable data is not OK after reading from {}: {e}",
                self.source.origin(ctx)
            )
        })
    }
}

impl Component for Signal1DLookupTable {
    fn type_name(&self) -> &'static str {
        "Signal1DLookupTable"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::S
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.input = cfg.add_input_variable("in", "Lookup input", "-", 0.0);
        self.out = cfg.add_output_variable("out", "Interpolated value");
        self.source.configure(cfg);
        self.in_column = cfg.add_parameter("inid", "csv file index column (0-based index)", "", 0.0);
        self.out_column = cfg.add_parameter("outid", "csv file value column (0-based index)", "", 1.0);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        self.handles = Some((
            signal_handle(ctx, self.input)?,
            signal_handle(ctx, self.out)?,
        ));
        match self.load_table(ctx) {
            Ok(table) => self.table = table,
            Err(message) => {
                fail(ctx, &message);
                return Ok(());
            }
        }
        self.simulate_one_timestep(ctx);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if let Some((input, out)) = self.handles {
            ctx.write(out, self.table.interpolate(ctx.read(input)));
        }
    }
}

/// `out = table(row, col)` from three-column `row, col, value` data that
/// covers a full grid.
#[derive(Debug, Default)]
pub struct Signal2DLookupTable {
    row: PortIdx,
    col: PortIdx,
    out: PortIdx,
    source: CsvSource,
    table: LookupTable2D,
    handles: Option<[SlotHandle; 3]>,
}

impl Signal2DLookupTable {
    fn load_table(&self, ctx: &SimContext<'_>) -> Result<LookupTable2D, String> {
        let data = self.source.load(ctx)?;
        let mut points = Vec::with_capacity(data.num_rows());
        for row in data.rows() {
            let &[r, c, v] = row.as_slice() else {
                return Err(format!("Wrong number of data columns: {} != 3", row.len()));
            };
            points.push([r, c, v]);
        }
        LookupTable2D::from_points(&points).map_err(|e| {
            format!(
                "The LookupTable data is not OK after reading from {}: {e}",
                self.source.origin(ctx)
            )
        })
    }
}

impl Component for Signal2DLookupTable {
    fn type_name(&self) -> &'static str {
        "Signal2DLookupTable"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::S
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.row = cfg.add_input_variable("row", "Row index input", "-", 0.0);
        self.col = cfg.add_input_variable("col", "Column index input", "-", 0.0);
        self.out = cfg.add_output_variable("out", "Interpolated value");
        self.source.configure(cfg);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        self.handles = Some([
            signal_handle(ctx, self.row)?,
            signal_handle(ctx, self.col)?,
            signal_handle(ctx, self.out)?,
        ]);
        match self.load_table(ctx) {
            Ok(table) => self.table = table,
            Err(message) => {
                fail(ctx, &message);
                return Ok(());
            }
        }
        self.simulate_one_timestep(ctx);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if let Some([row, col, out]) = self.handles {
            ctx.write(out, self.table.interpolate(ctx.read(row), ctx.read(col)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Rig;
    use tlm_core::MessageKind;
    use tlm_graph::node::Signal;

    const TS: f64 = 0.001;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("tlm_lookup_{}_{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn errors(rig: &Rig) -> Vec<String> {
        rig.messages
            .drain()
            .into_iter()
            .filter(|m| m.kind == MessageKind::Error)
            .map(|m| m.text)
            .collect()
    }

    #[test]
    fn table_from_file_interpolates() {
        let path = temp_file("flow.csv", "# q;dp\n0;0\n2;40\n1;10\n");
        let mut table = Signal1DLookupTable::default();
        let mut rig = Rig::new(&mut table, TS);
        rig.set_param("filename", path.to_str().unwrap());
        rig.set_param("csvsep", ";");
        rig.set_param("comment", "#");
        rig.set_param("in", "1.5");
        rig.initialize(&mut table).unwrap();
        let _ = std::fs::remove_file(&path);

        assert!(!rig.is_stopped());
        assert_eq!(rig.get(PortIdx(1), Signal::Value), 25.0);
        rig.set(PortIdx(0), Signal::Value, 5.0);
        rig.step(&mut table);
        assert_eq!(rig.get(PortIdx(1), Signal::Value), 40.0);
    }

    #[test]
    fn missing_file_stops_the_simulation() {
        let mut table = Signal1DLookupTable::default();
        let mut rig = Rig::new(&mut table, TS);
        rig.set_param("filename", "/nonexistent/tlm/table.csv");
        rig.initialize(&mut table).unwrap();

        assert!(rig.is_stopped());
        let errors = errors(&rig);
        assert_eq!(errors.len(), 1);
        assert!(
            errors[0].starts_with("Unable to initialize CSV file: /nonexistent/tlm/table.csv"),
            "{errors:?}"
        );
    }

    #[test]
    fn repeated_index_stops_the_simulation() {
        let mut table = Signal1DLookupTable::default();
        let mut rig = Rig::new(&mut table, TS);
        rig.set_param("text", "0,1\n1,2\n1,3\n");
        rig.initialize(&mut table).unwrap();

        assert!(rig.is_stopped());
        let errors = errors(&rig);
        assert!(errors[0].contains("still not strictly increasing"), "{errors:?}");
    }

    #[test]
    fn column_out_of_range_and_bad_fields_are_reported() {
        let mut table = Signal1DLookupTable::default();
        let mut rig = Rig::new(&mut table, TS);
        rig.set_param("text", "0,1\n1,2\n");
        rig.set_param("outid", "2");
        rig.initialize(&mut table).unwrap();
        assert!(rig.is_stopped());
        assert_eq!(errors(&rig), vec!["inid: 0 or outid: 2 is out of range!"]);

        let mut table = Signal1DLookupTable::default();
        let mut rig = Rig::new(&mut table, TS);
        rig.set_param("text", "0,1\n1,x\n");
        rig.initialize(&mut table).unwrap();
        assert!(rig.is_stopped());
        assert!(errors(&rig)[0].contains("line 2"));

        let mut table = Signal1DLookupTable::default();
        let mut rig = Rig::new(&mut table, TS);
        rig.set_param("text", "0,1\n1,2\n");
        rig.set_param("csvsep", ";;");
        rig.initialize(&mut table).unwrap();
        assert_eq!(errors(&rig), vec!["Separator character must be ONE character"]);
    }

    #[test]
    fn two_d_table_from_text() {
        let mut table = Signal2DLookupTable::default();
        let mut rig = Rig::new(&mut table, TS);
        rig.set_param("text", "0,0,0\n0,1,10\n1,0,1\n1,1,11\n");
        rig.set_param("row", "0.5");
        rig.set_param("col", "0.5");
        rig.initialize(&mut table).unwrap();
        assert!(!rig.is_stopped());
        assert!((rig.get(PortIdx(2), Signal::Value) - 5.5).abs() < 1e-12);
    }

    #[test]
    fn two_d_table_needs_three_columns() {
        let mut table = Signal2DLookupTable::default();
        let mut rig = Rig::new(&mut table, TS);
        rig.set_param("text", "0,0\n1,1\n");
        rig.initialize(&mut table).unwrap();
        assert!(rig.is_stopped());
        assert_eq!(errors(&rig), vec!["Wrong number of data columns: 2 != 3"]);
    }
}
