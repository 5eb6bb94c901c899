use super::observation::Observation;
use crate::utils::{Region, Result};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;

/// Observations of all reads overlapping a region, one row (track) per placed read.
///
/// `columns[w][d]` is track `d` at reference column `region.start + w`.
/// `inserts[a][k][d]` is the `k`-th inserted column before reference column `a`.
#[derive(Debug, Clone)]
pub struct Pileup<E> {
    pub region: Region,
    pub columns: Vec<Vec<Observation<E>>>,
    pub inserts: BTreeMap<usize, Vec<Vec<Observation<E>>>>,
    /// Non-empty cells per reference column.
    pub coverage_per_position: Vec<u32>,
    depth: usize,
}

impl<E: Copy + Default> Pileup<E> {
    /// A single empty track spanning the region.
    pub fn new(region: &Region) -> Self {
        let width = region.width();
        Self {
            region: region.clone(),
            columns: vec![vec![Observation::empty(); 1]; width],
            inserts: BTreeMap::new(),
            coverage_per_position: vec![0; width],
            depth: 1,
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Appends an empty track to every column and returns its index.
    pub fn add_track(&mut self) -> usize {
        for column in self.columns.iter_mut() {
            column.push(Observation::empty());
        }
        for column in self.inserts.values_mut().flatten() {
            column.push(Observation::empty());
        }
        self.depth += 1;
        self.depth - 1
    }

    pub fn set(&mut self, width: usize, depth: usize, observation: Observation<E>) -> Result<()> {
        let cell = self
            .columns
            .get_mut(width)
            .and_then(|column| column.get_mut(depth))
            .ok_or_else(|| {
                format!(
                    "Pileup cell ({}, {}) out of bounds for region {}",
                    width, depth, self.region
                )
            })?;
        if cell.is_empty() && !observation.is_empty() {
            self.coverage_per_position[width] += 1;
        }
        *cell = observation;
        Ok(())
    }

    /// Writes into insert column `offset` anchored at `anchor`, growing the anchor's columns as needed.
    pub fn set_insert(
        &mut self,
        anchor: usize,
        offset: usize,
        depth: usize,
        observation: Observation<E>,
    ) -> Result<()> {
        if anchor >= self.width() || depth >= self.depth {
            return Err(format!(
                "Insert cell ({}+{}, {}) out of bounds for region {}",
                anchor, offset, depth, self.region
            ));
        }
        let columns = self.inserts.entry(anchor).or_default();
        while columns.len() <= offset {
            columns.push(vec![Observation::empty(); self.depth]);
        }
        columns[offset][depth] = observation;
        Ok(())
    }

    pub fn column(&self, width: usize) -> &[Observation<E>] {
        &self.columns[width]
    }

    pub fn insert_columns(&self, anchor: usize) -> &[Vec<Observation<E>>] {
        self.inserts
            .get(&anchor)
            .map(|columns| columns.as_slice())
            .unwrap_or(&[])
    }

    /// Marks tracks that span an insertion junction without carrying the insertion.
    ///
    /// A track spans anchor `a` when it has observations at both `a - 1` and `a`.
    pub fn mark_insert_junctions(&mut self) {
        for (&anchor, insert_columns) in self.inserts.iter_mut() {
            if anchor == 0 {
                continue;
            }
            let (before, after) = (&self.columns[anchor - 1], &self.columns[anchor]);
            for depth in 0..self.depth {
                if before[depth].is_empty() || after[depth].is_empty() {
                    continue;
                }
                let reverse = after[depth].reverse;
                for column in insert_columns.iter_mut() {
                    if column[depth].is_empty() {
                        column[depth] = Observation::insert_marker(reverse);
                    }
                }
            }
        }
    }

    pub fn coverage(&self, width: usize) -> u32 {
        self.coverage_per_position[width]
    }
}

impl<E: fmt::Display> Pileup<E> {
    /// One line per column, insert columns first and prefixed with `+`.
    pub fn format_column(&self, width: usize) -> String {
        let mut lines = Vec::new();
        if let Some(insert_columns) = self.inserts.get(&width) {
            for column in insert_columns {
                lines.push(format!("+\t{}", column.iter().join(" ")));
            }
        }
        let position = self.region.start as usize + width;
        lines.push(format!(
            "{}\t{}",
            position,
            self.columns[width].iter().join(" ")
        ));
        lines.join("\n")
    }
}
