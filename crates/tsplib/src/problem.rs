use std::{
    fmt::{Display, Formatter},
    fs,
    path::Path,
};

use crate::{
    TsplibError, TsplibResult,
    header::{parse_dimension, split_header},
    ids::IdSet,
    writer::TsplibWriter,
};
use tsplib_derive::TsplibKeyword;

const NODE_COORD_SECTION: &str = "NODE_COORD_SECTION";
const EOF_MARKER: &str = "EOF";
const TSPLIB_NODE_ID_BASE: usize = 1;

/// TSPLIB `TYPE` values.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TsplibKeyword)]
pub enum TsplibProblemType {
    Tsp,
    Atsp,
    Sop,
    Hcp,
    Cvrp,
    Tour,
}

/// TSPLIB `EDGE_WEIGHT_TYPE` values.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TsplibKeyword)]
pub enum EdgeWeightType {
    Explicit,
    #[tsplib("EUC_2D")]
    Euc2d,
    #[tsplib("EUC_3D")]
    Euc3d,
    #[tsplib("MAX_2D")]
    Max2d,
    #[tsplib("MAN_2D")]
    Man2d,
    #[tsplib("CEIL_2D")]
    Ceil2d,
    Geo,
    Att,
}

/// Entry in `NODE_COORD_SECTION`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeCoord {
    pub id: usize,
    pub x: f64,
    pub y: f64,
}

impl NodeCoord {
    pub const fn new(id: usize, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }
}

impl Display for NodeCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.id, self.x, self.y)
    }
}

/// Symmetric 2D Euclidean problem: the TSPLIB subset read and written here.
#[derive(Clone, Debug, PartialEq)]
pub struct TsplibProblem {
    pub name: String,
    pub problem_type: TsplibProblemType,
    pub comment_lines: Vec<String>,
    pub dimension: Option<usize>,
    pub edge_weight_type: Option<EdgeWeightType>,
    pub node_coord_section: Vec<NodeCoord>,
    pub emit_eof: bool,
}

impl TsplibProblem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            problem_type: TsplibProblemType::Tsp,
            comment_lines: Vec::new(),
            dimension: None,
            edge_weight_type: None,
            node_coord_section: Vec::new(),
            emit_eof: true,
        }
    }

    pub fn from_euc2d_points<I>(name: impl Into<String>, points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
        I::IntoIter: ExactSizeIterator,
    {
        let points = points.into_iter();

        let mut problem = Self::new(name);
        problem.dimension = Some(points.len());
        problem.edge_weight_type = Some(EdgeWeightType::Euc2d);
        problem.node_coord_section = points
            .enumerate()
            .map(|(idx, (x, y))| NodeCoord::new(idx + TSPLIB_NODE_ID_BASE, x, y))
            .collect();

        problem
    }

    pub fn from_file(path: &Path) -> TsplibResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_text(&text)
    }

    /// Parses a problem. Only `TYPE : TSP` with `EDGE_WEIGHT_TYPE : EUC_2D` is
    /// accepted; unknown header lines are logged and skipped.
    pub fn from_text(text: &str) -> TsplibResult<Self> {
        let mut problem = Self::new(String::new());
        problem.emit_eof = false;
        let mut coords: Option<IdSet> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if line.eq_ignore_ascii_case(EOF_MARKER) {
                problem.emit_eof = true;
                break;
            }

            if let Some(ids) = coords.as_mut() {
                let coord = parse_node_coord(line_no, line)?;
                ids.record(line_no, coord.id as i64)?;
                problem.node_coord_section.push(coord);
                continue;
            }

            if line.eq_ignore_ascii_case(NODE_COORD_SECTION) {
                let Some(dimension) = problem.dimension else {
                    return Err(TsplibError::syntax(
                        line_no,
                        "NODE_COORD_SECTION appears before DIMENSION",
                    ));
                };
                coords = Some(IdSet::new(NODE_COORD_SECTION, dimension));
                continue;
            }

            let Some((key, value)) = split_header(line) else {
                log::warn!("tsplib: ignored line {line_no}: \"{line}\"");
                continue;
            };

            match key.as_str() {
                "NAME" => {
                    log::debug!("tsplib: reading problem \"{value}\"");
                    problem.name = value.to_string();
                }
                "TYPE" => {
                    let problem_type: TsplibProblemType = value
                        .parse()
                        .map_err(|e: TsplibError| TsplibError::syntax(line_no, e.to_string()))?;
                    if problem_type != TsplibProblemType::Tsp {
                        return Err(TsplibError::syntax(
                            line_no,
                            format!("Unsupported problem TYPE '{problem_type}'"),
                        ));
                    }
                    problem.problem_type = problem_type;
                }
                "COMMENT" => {
                    log::debug!("tsplib: comment \"{value}\"");
                    problem.comment_lines.push(value.to_string());
                }
                "DIMENSION" => {
                    problem.dimension = Some(parse_dimension(line_no, value)?);
                }
                "EDGE_WEIGHT_TYPE" => {
                    let edge_weight_type: EdgeWeightType = value
                        .parse()
                        .map_err(|e: TsplibError| TsplibError::syntax(line_no, e.to_string()))?;
                    if edge_weight_type != EdgeWeightType::Euc2d {
                        return Err(TsplibError::syntax(
                            line_no,
                            format!("Unsupported EDGE_WEIGHT_TYPE '{edge_weight_type}'"),
                        ));
                    }
                    problem.edge_weight_type = Some(edge_weight_type);
                }
                _ => {
                    log::warn!("tsplib: ignored header line {line_no}: \"{line}\"");
                }
            }
        }

        let Some(ids) = coords else {
            return Err(TsplibError::invalid_data("Missing NODE_COORD_SECTION"));
        };
        ids.finish()?;

        Ok(problem)
    }

    /// Returns the coordinates ordered by node id.
    pub fn coordinates(&self) -> TsplibResult<Vec<(f64, f64)>> {
        let entries = self.node_coord_section.len();
        let dimension = self.dimension.unwrap_or(entries);
        if dimension != entries {
            return Err(TsplibError::invalid_data(format!(
                "DIMENSION is {dimension}, but {NODE_COORD_SECTION} has {entries} entries"
            )));
        }
        let mut ids = IdSet::new(NODE_COORD_SECTION, dimension);
        let mut out = vec![(0.0, 0.0); entries];

        for (idx, coord) in self.node_coord_section.iter().enumerate() {
            let slot = ids.record(idx + 1, coord.id as i64)?;
            out[slot] = (coord.x, coord.y);
        }
        ids.finish()?;

        Ok(out)
    }

    pub fn write_to_file(&self, path: &Path) -> TsplibResult<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }
}

fn parse_node_coord(line_no: usize, line: &str) -> TsplibResult<NodeCoord> {
    let mut tokens = line.split_whitespace();
    let (Some(id), Some(x), Some(y)) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(TsplibError::syntax(
            line_no,
            format!("expected 'index x y' but got \"{line}\""),
        ));
    };
    if tokens.next().is_some() {
        return Err(TsplibError::syntax(
            line_no,
            format!("expected 'index x y' but got extra fields: \"{line}\""),
        ));
    }

    let id: i64 = id
        .parse()
        .map_err(|e| TsplibError::syntax(line_no, format!("Bad node id '{id}': {e}")))?;
    if id < 1 {
        return Err(TsplibError::syntax(
            line_no,
            format!("Bad node id {id}; TSPLIB ids must be >= {TSPLIB_NODE_ID_BASE}"),
        ));
    }
    let x: f64 = x
        .parse()
        .map_err(|e| TsplibError::syntax(line_no, format!("Bad x coordinate '{x}': {e}")))?;
    let y: f64 = y
        .parse()
        .map_err(|e| TsplibError::syntax(line_no, format!("Bad y coordinate '{y}': {e}")))?;

    Ok(NodeCoord::new(id as usize, x, y))
}

impl Display for TsplibProblem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut out = TsplibWriter::new(f);
        out.header("NAME", &self.name)?;
        out.header("TYPE", self.problem_type)?;
        for comment in &self.comment_lines {
            out.header("COMMENT", comment)?;
        }
        out.header_if("DIMENSION", self.dimension)?;
        out.header_if("EDGE_WEIGHT_TYPE", self.edge_weight_type)?;
        out.section(NODE_COORD_SECTION, &self.node_coord_section, None)?;
        out.finish(self.emit_eof)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::PathBuf,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::{EdgeWeightType, NodeCoord, TsplibProblem, TsplibProblemType};

    fn unique_temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("tsplib-tests-{name}-{nanos}"))
    }

    const SAMPLE: &str = "NAME : square5
TYPE : TSP
COMMENT : four corners and a center
DIMENSION : 5
EDGE_WEIGHT_TYPE : EUC_2D
NODE_COORD_SECTION
1 0 0
2 1 0
5 0.5 0.5
3 1 1
4 0 1
EOF
";

    #[test]
    fn parse_reads_headers_and_coordinates() {
        let problem = TsplibProblem::from_text(SAMPLE).expect("parse problem");
        assert_eq!(problem.name, "square5");
        assert_eq!(problem.problem_type, TsplibProblemType::Tsp);
        assert_eq!(problem.comment_lines, vec!["four corners and a center"]);
        assert_eq!(problem.dimension, Some(5));
        assert_eq!(problem.edge_weight_type, Some(EdgeWeightType::Euc2d));
        assert_eq!(problem.node_coord_section.len(), 5);
        assert!(problem.emit_eof);
    }

    #[test]
    fn coordinates_are_ordered_by_id() {
        let problem = TsplibProblem::from_text(SAMPLE).expect("parse problem");
        let coords = problem.coordinates().expect("coordinates");
        assert_eq!(
            coords,
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.5, 0.5)]
        );
    }

    #[test]
    fn parse_rejects_non_tsp_type() {
        let text = SAMPLE.replace("TYPE : TSP", "TYPE : ATSP");
        let err = TsplibProblem::from_text(&text).expect_err("ATSP is unsupported");
        assert!(err.to_string().contains("Unsupported problem TYPE 'ATSP'"));
    }

    #[test]
    fn parse_rejects_non_euclidean_weights() {
        let text = SAMPLE.replace("EUC_2D", "GEO");
        let err = TsplibProblem::from_text(&text).expect_err("GEO is unsupported");
        assert!(err.to_string().contains("Unsupported EDGE_WEIGHT_TYPE 'GEO'"));
    }

    #[test]
    fn parse_rejects_ids_beyond_dimension() {
        let text = SAMPLE.replace("5 0.5 0.5", "6 0.5 0.5");
        let err = TsplibProblem::from_text(&text).expect_err("id 6 > DIMENSION");
        assert!(err.to_string().contains("line 9"));
        assert!(err.to_string().contains("outside 1..=5"));
    }

    #[test]
    fn parse_rejects_duplicate_ids() {
        let text = SAMPLE.replace("5 0.5 0.5", "1 0.5 0.5");
        let err = TsplibProblem::from_text(&text).expect_err("duplicate id");
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn parse_rejects_missing_nodes() {
        let text = SAMPLE.replace("5 0.5 0.5\n", "");
        let err = TsplibProblem::from_text(&text).expect_err("one node missing");
        assert!(err.to_string().contains("DIMENSION is 5"));
    }

    #[test]
    fn oversized_dimension_is_an_error_not_an_allocation() {
        for dimension in ["18446744073709551615", "1000000000000"] {
            let text = format!(
                "NAME : x\nTYPE : TSP\nDIMENSION : {dimension}\nEDGE_WEIGHT_TYPE : EUC_2D\n\
                 NODE_COORD_SECTION\n1 0 0\nEOF\n"
            );
            let err = TsplibProblem::from_text(&text).expect_err("one node of many");
            assert!(
                err.to_string().contains(&format!("DIMENSION is {dimension}")),
                "{err}"
            );
        }
    }

    #[test]
    fn coordinates_check_dimension_before_allocating() {
        let mut problem = TsplibProblem::from_euc2d_points("x", vec![(0.0, 0.0)]);
        problem.dimension = Some(usize::MAX);
        let err = problem.coordinates().expect_err("dimension disagrees");
        assert!(err.to_string().contains("has 1 entries"));
    }

    #[test]
    fn parse_requires_dimension_before_coordinates() {
        let err = TsplibProblem::from_text("NAME : x\nNODE_COORD_SECTION\n1 0 0\nEOF\n")
            .expect_err("no DIMENSION");
        assert!(err.to_string().contains("before DIMENSION"));
    }

    #[test]
    fn parse_skips_unknown_headers() {
        let text = SAMPLE.replace("COMMENT", "NODE_COORD_TYPE : TWOD_COORDS\nCOMMENT");
        let problem = TsplibProblem::from_text(&text).expect("unknown header is ignored");
        assert_eq!(problem.node_coord_section.len(), 5);
    }

    #[test]
    fn display_keeps_headers_before_sections() {
        let problem = TsplibProblem::from_euc2d_points("tri", vec![(0.0, 0.0), (2.5, 0.0), (0.0, 1.0)]);
        let text = problem.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "NAME : tri");
        assert_eq!(lines[1], "TYPE : TSP");
        assert_eq!(lines[2], "DIMENSION : 3");
        assert_eq!(lines[3], "EDGE_WEIGHT_TYPE : EUC_2D");
        assert_eq!(lines[4], "NODE_COORD_SECTION");
        assert_eq!(lines[5], "1 0 0");
        assert_eq!(lines[6], "2 2.5 0");
        assert!(text.ends_with("EOF\n"));
    }

    #[test]
    fn written_problem_reads_back() {
        let dir = unique_temp_dir("problem-rw");
        fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("problem.tsp");

        let mut problem =
            TsplibProblem::from_euc2d_points("rw", vec![(0.25, 1.5), (3.0, -2.0), (7.125, 0.0)]);
        problem.comment_lines.push("round trip".to_string());
        problem.write_to_file(&path).expect("write problem");

        let read = TsplibProblem::from_file(&path).expect("read problem");
        assert_eq!(read, problem);
        assert_eq!(read.node_coord_section[1], NodeCoord::new(2, 3.0, -2.0));

        fs::remove_dir_all(&dir).expect("cleanup temp dir");
    }
}
