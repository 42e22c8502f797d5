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

//! Helpers deriving short model names used as table columns.

/// Short model name from the path of an OPeNDAP endpoint.
///
/// Directories already contained in the file name are skipped
/// and the `.nc`/`.ncd` extension is removed.
pub fn model_name_from_url(url: &str) -> String {
    let path = url.rsplit("dodsC/").next().unwrap_or(url);
    let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();

    let file_name = parts.pop().unwrap_or("");
    let file_name = file_name
        .strip_suffix(".ncd")
        .or_else(|| file_name.strip_suffix(".nc"))
        .unwrap_or(file_name);

    let lower_file_name = file_name.to_lowercase();
    let directories: Vec<&str> = parts
        .into_iter()
        .filter(|dir| !lower_file_name.contains(&dir.to_lowercase()))
        .collect();

    if directories.is_empty() {
        file_name.to_string()
    } else {
        format!("{}-{}", directories.join("_"), file_name)
    }
}

fn is_upper(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

/// Returns the text between the first `(` and the last `)`,
/// or the whole word when there are no parentheses.
fn remove_parenthesis(word: &str) -> &str {
    match (word.find('('), word.rfind(')')) {
        (Some(open), Some(close)) if open < close => &word[open + 1..close],
        _ => word,
    }
}

/// Guesses short model name from its long title,
/// eg. `HYbrid Coordinate Ocean Model (HYCOM): Global` gives `HYCOM`.
pub fn guess_model_name(title: &str) -> String {
    let mut words: Vec<&str> = title
        .split_whitespace()
        .filter(|word| is_upper(word))
        .map(remove_parenthesis)
        .filter(|word| !word.is_empty())
        .collect();

    if words.is_empty() {
        let head = title.split('(').next().unwrap_or("");
        return head.chars().filter(|c| c.is_uppercase()).collect();
    }

    words.truncate(2);
    words.join("_")
}

/// Replaces separators with underscores.
pub fn sanitize_name(name: &str) -> String {
    name.replace(", ", "_")
        .replace('/', "_")
        .replace(' ', "_")
        .replace(',', "_")
}

#[cfg(test)]
mod tests {
    use super::{guess_model_name, model_name_from_url, sanitize_name};

    #[test]
    fn names_from_urls() {
        let url = "http://omgsrv1.meas.ncsu.edu:8080/thredds/dodsC/fmrc/sabgom/\
                   SABGOM_Forecast_Model_Run_Collection_best.ncd";
        assert_eq!(
            model_name_from_url(url),
            "fmrc-SABGOM_Forecast_Model_Run_Collection_best"
        );

        let url = "http://oos.soest.hawaii.edu/thredds/dodsC/hioos/model/wav/ww3/ww3.nc";
        assert_eq!(model_name_from_url(url), "hioos_model_wav-ww3");
    }

    #[test]
    fn names_from_titles() {
        let titles = [
            "USF FVCOM - Nowcast Aggregation",
            "ROMS/TOMS 3.0 - New Floria Shelf Application",
            "COAWST Forecast System : USGS : US East Coast and Gulf of Mexico (Experimental)",
            "HYbrid Coordinate Ocean Model (HYCOM): Global",
            "ROMS ESPRESSO Real-Time Operational IS4DVAR Forecast System Version 2 (NEW) 2013-present FMRC History (Best)",
        ];

        let names: Vec<String> = titles.iter().map(|t| guess_model_name(t)).collect();

        assert_eq!(
            names,
            vec!["USF_FVCOM", "ROMS/TOMS", "COAWST_USGS", "HYCOM", "ROMS_ESPRESSO"]
        );

        assert_eq!(guess_model_name("Global Ocean Forecast"), "GOF");
    }

    #[test]
    fn sanitizing() {
        assert_eq!(sanitize_name("ROMS/TOMS"), "ROMS_TOMS");
        assert_eq!(sanitize_name("USEAST model"), "USEAST_model");
        assert_eq!(sanitize_name("GG1SST, SST"), "GG1SST_SST");
    }
}
