/*
Copyright 2021 Jakub Lewandowski

This file is part of Ocean Model Skill Assessment (OMSA).

Ocean Model Skill Assessment (OMSA) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Ocean Model Skill Assessment (OMSA) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Ocean Model Skill Assessment (OMSA). If not, see https://www.gnu.org/licenses/.
*/

//! Module responsible for writing comparison results.

use crate::{errors::OutputError, skill::SkillTable, Float};
use log::debug;
use serde::Serialize;
use std::{fs, path::Path};

/// Checks the output directory, creating it when it does not exist.
///
/// Results of previous runs are never overwritten, so an existing
/// directory must be empty.
pub fn prepare_output_dir(out_path: &Path) -> Result<(), OutputError> {
    debug!("Checking and setting output directory");

    if out_path.is_dir() {
        if out_path.read_dir()?.next().is_none() {
            debug!("Output directory exists but is empty so continuing");
        } else {
            return Err(OutputError::FaultyOutput(
                "Output directory exists and is not empty",
            ));
        }
    } else {
        debug!("Output directory does not exist so creating a new one");
        fs::create_dir_all(out_path)?;
    }

    Ok(())
}

/// Grid point chosen for a station in one model.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct MatchRecord {
    pub station: String,
    pub model: String,
    pub index: String,
    pub distance: Float,
    pub lon: Float,
    pub lat: Float,
}

/// Writes the skill table with one row per station
/// and one column per model. Missing scores are left empty.
pub fn save_skill_table(out_path: &Path, table: &SkillTable) -> Result<(), OutputError> {
    let models = table.models();

    let mut out_file = csv::Writer::from_path(out_path)?;

    let mut header = vec!["station"];
    header.extend(models.iter().copied());
    out_file.write_record(&header)?;

    for (station, scores) in table.rows() {
        let mut record = vec![station.to_string()];

        record.extend(models.iter().map(|&model| {
            scores
                .get(model)
                .copied()
                .flatten()
                .map(|score| score.to_string())
                .unwrap_or_default()
        }));

        out_file.write_record(&record)?;
    }

    out_file.flush()?;

    Ok(())
}

pub fn save_matches(out_path: &Path, matches: &[MatchRecord]) -> Result<(), OutputError> {
    let mut out_file = csv::Writer::from_path(out_path)?;

    for record in matches {
        out_file.serialize(record)?;
    }

    out_file.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::time::parse_datetime;
    use crate::skill::{Comparison, SkillOptions, Statistic};
    use crate::timeseries::TimeSeries;
    use std::env;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = env::temp_dir().join(format!("omsa-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn output_dir_must_be_empty() {
        let dir = scratch_dir("prepare");

        prepare_output_dir(&dir).unwrap();
        assert!(dir.is_dir());
        prepare_output_dir(&dir).unwrap();

        fs::write(dir.join("old.csv"), "station\n").unwrap();
        assert!(matches!(
            prepare_output_dir(&dir),
            Err(OutputError::FaultyOutput(_))
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn writes_tables() {
        let dir = scratch_dir("tables");
        prepare_output_dir(&dir).unwrap();

        let start = parse_datetime("2016-07-01").unwrap();
        let times = vec![start, start + chrono::Duration::hours(1)];
        let series = |values: Vec<Float>| TimeSeries::new(times.clone(), values).unwrap();

        let comparisons = vec![Comparison {
            station: "8724580".to_string(),
            observations: series(vec![1.0, 2.0]),
            models: vec![
                ("HYCOM".to_string(), series(vec![1.5, 2.5])),
                ("ROMS".to_string(), series(vec![Float::NAN, Float::NAN])),
            ],
        }];

        let options = SkillOptions {
            remove_mean: false,
            ..SkillOptions::default()
        };
        let table = SkillTable::compute(&comparisons, Statistic::MeanBias, &options);

        let table_path = dir.join("skill_mean_bias.csv");
        save_skill_table(&table_path, &table).unwrap();
        assert_eq!(
            fs::read_to_string(&table_path).unwrap(),
            "station,HYCOM,ROMS\n8724580,0.5,\n"
        );

        let matches_path = dir.join("matches.csv");
        save_matches(
            &matches_path,
            &[MatchRecord {
                station: "8724580".to_string(),
                model: "HYCOM".to_string(),
                index: "3;4".to_string(),
                distance: 0.25,
                lon: -81.75,
                lat: 24.5,
            }],
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(&matches_path).unwrap(),
            "station,model,index,distance,lon,lat\n8724580,HYCOM,3;4,0.25,-81.75,24.5\n"
        );

        fs::remove_dir_all(&dir).unwrap();
    }
}
