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

//! Module containing the batch comparison of models against observations.
//!
//! The comparison runs in following steps:
//!
//! 1. Configuration is read and checked, memory limit is set and
//!    the thread pool is built.
//! 2. Station observations are read, filtered by phenomenon and region,
//!    converted to the target units and cleaned from out-of-order samples.
//! 3. Each model variable is read, constrained to the region, time interval
//!    and units, reduced to its surface layer and indexed. Models that fail
//!    any of these steps are skipped.
//! 4. For every station and model pair the nearest water point is resolved
//!    on the thread pool. Pairs without such point are skipped.
//! 5. Matched model series are interpolated onto observation times
//!    and skill tables are written to the output directory.

use crate::{
    configuration::{Config, ModelSource, RunConfig},
    errors::{MatchError, PrepareError, RunError},
    grid::{extract_surface, inspect_topology, subset::constrain, GriddedVariable},
    input::{load_model, load_observations, model_name},
    matching::{nearest_water, MatchedSeries, SearchParams, SpatialIndex},
    observation::StationObservation,
    output::{prepare_output_dir, save_matches, save_skill_table, MatchRecord},
    skill::{qaqc, Comparison, SkillTable, Statistic},
    ALLOCATOR,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{
    path::Path,
    sync::{mpsc, Arc},
};

/// Statistics written by the comparison, one table each.
const STATISTICS: [Statistic; 2] = [Statistic::MeanBias, Statistic::Rmse];

/// Main comparison function, responsible for all steps of the run.
pub fn main(config_path: &Path) -> Result<(), RunError> {
    info!("Preparing the comparison core");

    let core = Core::new(config_path)?;
    let run = core.config.run_config()?;

    prepare_output_dir(&core.config.output.directory)?;

    info!("Reading observations between {} and {}", run.start, run.stop);
    let stations = prepare_stations(&core.config.input.observations, &run)?;

    if stations.is_empty() {
        return Err(RunError::NoStations);
    }

    info!("Preparing {} models", core.config.input.models.len());
    let models: Vec<PreparedModel> = core
        .config
        .input
        .models
        .iter()
        .filter_map(|source| match prepare_model(source, &run) {
            Ok(model) => Some(model),
            Err(err) => {
                warn!("Skipping model {}: {}", source.path.display(), err);
                None
            }
        })
        .collect();

    if models.is_empty() {
        return Err(RunError::NoModels);
    }

    let stations = Arc::new(stations);
    let models = Arc::new(models);

    let matches = resolve_matches(&core, &stations, &models);

    info!("Computing skill of {} matched series", matches.len());
    let comparisons = build_comparisons(&stations, &models, &matches);

    info!("Writing output");
    let out_dir = &core.config.output.directory;

    for statistic in STATISTICS {
        let table = SkillTable::compute(&comparisons, statistic, &core.config.skill);
        save_skill_table(&out_dir.join(format!("skill_{}.csv", statistic)), &table)?;
    }

    let records: Vec<MatchRecord> = matches
        .iter()
        .map(|found| MatchRecord {
            station: stations[found.station].station_code.clone(),
            model: models[found.model].name.clone(),
            index: found.matched.index.to_string(),
            distance: found.matched.distance,
            lon: found.matched.position.0,
            lat: found.matched.position.1,
        })
        .collect();

    save_matches(&out_dir.join("matches.csv"), &records)?;

    Ok(())
}

/// Structure containing the resources of the run.
#[derive(Debug)]
pub struct Core {
    pub config: Config,
    pub threadpool: ThreadPool,
}

impl Core {
    /// Comparison [`Core`] constructor.
    ///
    /// Configuration is loaded and checked before anything
    /// else happens, so that the run fails early.
    pub fn new(config_path: &Path) -> Result<Self, RunError> {
        debug!("Reading configuration from {}", config_path.display());
        let config = Config::new_from_file(config_path)?;

        debug!("Setting memory limit");
        let memory = config.resources.memory;
        ALLOCATOR
            .set_limit(memory.saturating_mul(1024 * 1024))
            .map_err(|_| RunError::MemoryLimit(memory))?;

        debug!("Setting up ThreadPool");
        let threadpool = ThreadPoolBuilder::new()
            .num_threads(config.resources.threads as usize)
            .stack_size(2 * 1024 * 1024)
            .build()?;

        Ok(Core { config, threadpool })
    }
}

/// Model variable ready for matching.
#[derive(Debug)]
pub struct PreparedModel {
    pub name: String,
    pub variable: GriddedVariable,
    pub index: SpatialIndex,
}

/// Reads the model and reduces it to the surface series
/// inside the region and time interval of the run.
pub fn prepare_model(source: &ModelSource, run: &RunConfig) -> Result<PreparedModel, PrepareError> {
    debug!("Reading model from {}", source.path.display());
    let variable = load_model(&source.path)?;
    let name = model_name(source.name.as_deref(), &variable, &source.path);

    match variable.standard_name() {
        Some(standard_name) if !run.accepts(standard_name) => warn!(
            "Model {} provides {} which is not among accepted names",
            name, standard_name
        ),
        _ => (),
    }

    let variable = constrain(
        &variable,
        Some(&run.bbox),
        Some((run.start, Some(run.stop))),
        Some(&run.units),
    )?;

    let topology = inspect_topology(&variable)?;
    debug!("Model {} has {:?} topology", name, topology);

    let variable = extract_surface(&variable, topology)?;
    let times = variable.times()?;
    let index = SpatialIndex::build(&variable, topology)?;

    debug!(
        "Model {} indexed with {} points and {} time steps",
        name,
        index.len(),
        times.len()
    );

    Ok(PreparedModel {
        name,
        variable,
        index,
    })
}

/// Reads observations and keeps stations measuring accepted
/// phenomena inside the region, in target units.
pub fn prepare_stations(path: &Path, run: &RunConfig) -> Result<Vec<StationObservation>, RunError> {
    let observations = load_observations(path)?;
    let mut stations = Vec::with_capacity(observations.len());

    for station in observations {
        if !run.accepts(&station.standard_name) {
            debug!(
                "Station {} measures {}, skipping",
                station.station_code, station.standard_name
            );
            continue;
        }

        if !run.bbox.contains(station.lon, station.lat) {
            debug!("Station {} is outside of region, skipping", station.station_code);
            continue;
        }

        let station = match station.convert_units(&run.units) {
            Ok(station) => station,
            Err(err) => {
                warn!("Skipping station {}: {}", station.station_code, err);
                continue;
            }
        };

        if !qaqc::is_monotonically_increasing(station.series.times()) {
            debug!("Dropping out-of-order samples of station {}", station.station_code);
        }

        let series = station
            .series
            .retain_increasing()
            .between(run.start, run.stop);

        if series.valid_count() == 0 {
            warn!("Station {} has no valid observations in time interval", station.station_code);
            continue;
        }

        stations.push(StationObservation { series, ..station });
    }

    info!("Kept {} observing stations", stations.len());

    Ok(stations)
}

/// Water point found for the station in the model.
#[derive(Clone, Debug)]
pub struct StationMatch {
    pub station: usize,
    pub model: usize,
    pub matched: MatchedSeries,
}

/// Resolves every station and model pair on the thread pool.
/// Pairs that cannot be resolved are logged and skipped.
fn resolve_matches(
    core: &Core,
    stations: &Arc<Vec<StationObservation>>,
    models: &Arc<Vec<PreparedModel>>,
) -> Vec<StationMatch> {
    let jobs_count = stations.len() * models.len();
    let params: SearchParams = core.config.search;

    let bar = ProgressBar::new(jobs_count as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("#>-"),
    );
    bar.set_prefix("Matched stations");

    let (tx, rx) = mpsc::channel();

    for station in 0..stations.len() {
        for model in 0..models.len() {
            let tx = tx.clone();
            let stations = Arc::clone(stations);
            let models = Arc::clone(models);

            core.threadpool.spawn(move || {
                let obs = &stations[station];
                let prepared = &models[model];

                let result = nearest_water(
                    &prepared.variable,
                    &prepared.index,
                    (obs.lon, obs.lat),
                    &params,
                );

                if tx.send((station, model, result)).is_err() {
                    error!("Receiver of matching results closed before all jobs finished");
                }
            });
        }
    }

    drop(tx);

    let mut matches = Vec::with_capacity(jobs_count);

    for _ in 0..jobs_count {
        let (station, model, result): (usize, usize, Result<MatchedSeries, MatchError>) =
            match rx.recv() {
                Ok(received) => received,
                Err(err) => {
                    error!("Receiving matching result failed: {}", err);
                    break;
                }
            };

        match result {
            Ok(matched) => {
                debug!(
                    "Station {} matched in {} at {} ({} deg away)",
                    stations[station].station_code,
                    models[model].name,
                    matched.index,
                    matched.distance
                );
                matches.push(StationMatch {
                    station,
                    model,
                    matched,
                });
            }
            Err(err) => {
                warn!(
                    "Station {} not matched in {}: {}",
                    stations[station].station_code, models[model].name, err
                );
            }
        }

        bar.inc(1);
    }

    bar.finish_with_message("All stations matched");

    // results arrive in completion order
    matches.sort_by_key(|found| (found.station, found.model));

    matches
}

/// Groups matched series by station, interpolated onto observation times.
fn build_comparisons(
    stations: &[StationObservation],
    models: &[PreparedModel],
    matches: &[StationMatch],
) -> Vec<Comparison> {
    stations
        .iter()
        .enumerate()
        .filter_map(|(i, station)| {
            let station_models: Vec<(String, _)> = matches
                .iter()
                .filter(|found| found.station == i)
                .map(|found| {
                    let series = found
                        .matched
                        .series
                        .retain_increasing()
                        .interpolate_to(station.series.times());

                    (models[found.model].name.clone(), series)
                })
                .collect();

            if station_models.is_empty() {
                warn!("Station {} has no match in any model", station.station_code);
                return None;
            }

            Some(Comparison {
                station: station.station_code.clone(),
                observations: station.series.clone(),
                models: station_models,
            })
        })
        .collect()
}
