use chrono::{Days, NaiveDate};

use crate::domain::{
    Descriptor, GFS_CYCLES, GfsDescriptor, HRRR_LAST_HOUR, HrrrDescriptor, RAP_CYCLES,
    RapDescriptor,
};
use crate::error::NwpError;

pub fn next_cycle(descriptor: &Descriptor) -> Result<Descriptor, NwpError> {
    let next = match descriptor {
        Descriptor::Rap(d) => {
            let (cycle, date) = next_in_set(&RAP_CYCLES, &d.cycle, d.date)?;
            Descriptor::Rap(RapDescriptor {
                date,
                cycle,
                ..d.clone()
            })
        }
        Descriptor::Gfs(d) => {
            let (cycle, date) = next_in_set(&GFS_CYCLES, &d.cycle, d.date)?;
            Descriptor::Gfs(GfsDescriptor {
                date,
                cycle,
                ..d.clone()
            })
        }
        Descriptor::Hrrr(d) => {
            if d.cycle > HRRR_LAST_HOUR {
                return Err(invalid_cycle(d.cycle.to_string()));
            }
            let (cycle, date) = if d.cycle == HRRR_LAST_HOUR {
                (0, next_day(d.date)?)
            } else {
                (d.cycle + 1, d.date)
            };
            Descriptor::Hrrr(HrrrDescriptor {
                date,
                cycle,
                ..d.clone()
            })
        }
    };
    Ok(next)
}

pub fn advance(descriptor: &Descriptor, steps: usize) -> Result<Descriptor, NwpError> {
    let mut current = descriptor.clone();
    for _ in 0..steps {
        current = next_cycle(&current)?;
    }
    Ok(current)
}

fn next_in_set(
    cycles: &[&str],
    current: &str,
    date: NaiveDate,
) -> Result<(String, NaiveDate), NwpError> {
    let position = cycles
        .iter()
        .position(|cycle| *cycle == current)
        .ok_or_else(|| invalid_cycle(current.to_string()))?;
    match cycles.get(position + 1) {
        Some(next) => Ok((next.to_string(), date)),
        None => Ok((cycles[0].to_string(), next_day(date)?)),
    }
}

fn next_day(date: NaiveDate) -> Result<NaiveDate, NwpError> {
    date.checked_add_days(Days::new(1))
        .ok_or_else(|| NwpError::InvalidField {
            field: "date",
            value: date.to_string(),
        })
}

fn invalid_cycle(value: String) -> NwpError {
    NwpError::InvalidField {
        field: "cycle",
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gfs_wraps_to_next_day() {
        let start: Descriptor = GfsDescriptor {
            date: NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
            cycle: "18".to_string(),
            ..GfsDescriptor::default()
        }
        .into();
        let next = next_cycle(&start).unwrap();
        assert_eq!(next.date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        match next {
            Descriptor::Gfs(d) => assert_eq!(d.cycle, "00"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
