use std::{
    fmt::{self, Display, Formatter},
    fs,
    path::Path,
};

use tsplib_derive::TsplibKeyword;

use crate::{
    TsplibError, TsplibResult,
    header::{parse_dimension, split_header},
    ids::IdSet,
    writer::TsplibWriter,
};

const TOUR_SECTION_HEADER: &str = "TOUR_SECTION";
const TOUR_END_MARKER: &str = "-1";

/// `TYPE` of a `.tour` file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TsplibKeyword)]
pub enum TsplibTourType {
    Tour,
}

/// A `.tour` file: headers plus one permutation of `1..=DIMENSION`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TsplibTour {
    pub name: Option<String>,
    pub comment_lines: Vec<String>,
    pub tour_type: Option<TsplibTourType>,
    pub dimension: Option<usize>,
    /// 1-based node ids in visiting order.
    pub tour_section: Vec<usize>,
    pub emit_eof: bool,
}

/// Where the reader is in a tour file.
enum Part {
    Headers,
    Ids(IdSet),
    Terminated(IdSet),
}

impl TsplibTour {
    pub fn new() -> Self {
        Self {
            emit_eof: true,
            ..Self::default()
        }
    }

    /// Complete `TYPE : TOUR` file for a 0-based visiting order.
    pub fn from_zero_based(name: impl Into<String>, order: &[u32]) -> Self {
        Self {
            name: Some(name.into()),
            tour_type: Some(TsplibTourType::Tour),
            dimension: Some(order.len()),
            tour_section: order.iter().map(|&idx| idx as usize + 1).collect(),
            ..Self::new()
        }
    }

    pub fn from_file(path: &Path) -> TsplibResult<Self> {
        Self::from_text(&fs::read_to_string(path)?)
    }

    /// Strict parse: `DIMENSION` must precede `TOUR_SECTION`, the section
    /// must hold every id of `1..=DIMENSION` once and end with `-1`.
    pub fn from_text(text: &str) -> TsplibResult<Self> {
        let mut tour = Self {
            emit_eof: false,
            ..Self::default()
        };
        let mut part = Part::Headers;

        for (line_no, line) in text.lines().enumerate().map(|(idx, l)| (idx + 1, l.trim())) {
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("EOF") {
                tour.emit_eof = true;
                break;
            }

            part = match part {
                Part::Headers => tour.read_header(line_no, line)?,
                Part::Ids(ids) => tour.read_ids(line_no, line, ids)?,
                Part::Terminated(_) => {
                    return Err(TsplibError::syntax(
                        line_no,
                        format!("unexpected \"{line}\" after the -1 terminator"),
                    ));
                }
            };
        }

        match part {
            Part::Headers => Err(TsplibError::invalid_data("Missing TOUR_SECTION")),
            Part::Ids(_) => Err(TsplibError::invalid_data(
                "TOUR_SECTION is not terminated by -1",
            )),
            Part::Terminated(ids) => {
                ids.finish()?;
                Ok(tour)
            }
        }
    }

    fn read_header(&mut self, line_no: usize, line: &str) -> TsplibResult<Part> {
        if line.eq_ignore_ascii_case(TOUR_SECTION_HEADER) {
            let dimension = self.dimension.ok_or_else(|| {
                TsplibError::syntax(line_no, "TOUR_SECTION appears before DIMENSION")
            })?;
            return Ok(Part::Ids(IdSet::new(TOUR_SECTION_HEADER, dimension)));
        }

        match split_header(line) {
            Some((key, value)) => match key.as_str() {
                "NAME" => self.name = Some(value.to_string()),
                "COMMENT" => self.comment_lines.push(value.to_string()),
                "TYPE" => {
                    self.tour_type = Some(value.parse().map_err(|e: TsplibError| {
                        TsplibError::syntax(line_no, e.to_string())
                    })?);
                }
                "DIMENSION" => self.dimension = Some(parse_dimension(line_no, value)?),
                _ => log::warn!("tsplib: ignored header line {line_no}: \"{line}\""),
            },
            None => log::warn!("tsplib: ignored line {line_no}: \"{line}\""),
        }
        Ok(Part::Headers)
    }

    /// Several ids may share a line; nothing may follow the terminator.
    fn read_ids(&mut self, line_no: usize, line: &str, mut ids: IdSet) -> TsplibResult<Part> {
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            if token == TOUR_END_MARKER {
                if let Some(extra) = tokens.next() {
                    return Err(TsplibError::syntax(
                        line_no,
                        format!("unexpected \"{extra}\" after the -1 terminator"),
                    ));
                }
                return Ok(Part::Terminated(ids));
            }

            let id: i64 = token.parse().map_err(|e| {
                TsplibError::syntax(line_no, format!("Bad tour token '{token}': {e}"))
            })?;
            ids.record(line_no, id)?;
            self.tour_section.push(id as usize);
        }
        Ok(Part::Ids(ids))
    }

    /// The tour as 0-based point indices.
    pub fn zero_based_tour(&self) -> TsplibResult<Vec<u32>> {
        self.tour_section
            .iter()
            .map(|&id| {
                id.checked_sub(1)
                    .and_then(|idx| u32::try_from(idx).ok())
                    .ok_or_else(|| {
                        TsplibError::invalid_data(format!(
                            "node id {id} is not a valid 1-based u32 index"
                        ))
                    })
            })
            .collect()
    }

    pub fn write_to_file(&self, path: &Path) -> TsplibResult<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl Display for TsplibTour {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut out = TsplibWriter::new(f);
        out.header_if("NAME", self.name.as_deref())?;
        out.header_if("TYPE", self.tour_type)?;
        for comment in &self.comment_lines {
            out.header("COMMENT", comment)?;
        }
        out.header_if("DIMENSION", self.dimension)?;
        out.section(
            TOUR_SECTION_HEADER,
            &self.tour_section,
            Some(TOUR_END_MARKER),
        )?;
        out.finish(self.emit_eof)
    }
}
