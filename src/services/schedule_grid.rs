use crate::entities::shift_entity as shifts;
use crate::models::{GridCell, GridRow, RoleColumn, ScheduleGrid, ShiftSummary};
use chrono::{DateTime, Duration, DurationRound, Utc};
use std::collections::{HashMap, HashSet};

fn floor_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(Duration::hours(1)).unwrap_or(t)
}

fn ceil_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    let floor = floor_hour(t);
    if floor < t { floor + Duration::hours(1) } else { floor }
}

fn hour_slots(from: DateTime<Utc>, to: DateTime<Utc>) -> impl Iterator<Item = DateTime<Utc>> {
    std::iter::successors(Some(from), |h| Some(*h + Duration::hours(1))).take_while(move |h| *h < to)
}

/// Lays shifts out as an hour-by-role table.
///
/// Each shift covers the hour slots from its start (floored) up to its end
/// (rounded up). The first slot carries the shift and its `rowspan`; the
/// rest are `ShiftContinue`. When two shifts of one role cover the same
/// slot, the later one in `shifts` wins. Hours are UTC.
///
/// `assigned` maps shift id to its current assignment count; `signed_up`
/// holds the shift ids the viewing user is assigned to.
pub fn build_schedule_grid(
    roles: &[RoleColumn],
    shifts: &[shifts::Model],
    assigned: &HashMap<i32, u64>,
    signed_up: &HashSet<i32>,
) -> ScheduleGrid {
    let min_hour = shifts.iter().map(|s| floor_hour(s.start_time)).min();
    let max_hour = shifts.iter().map(|s| ceil_hour(s.end_time)).max();
    let (Some(min_hour), Some(max_hour)) = (min_hour, max_hour) else {
        return ScheduleGrid::default();
    };

    let mut occupied: HashMap<(i32, DateTime<Utc>), &shifts::Model> = HashMap::new();
    for shift in shifts {
        for hour in hour_slots(floor_hour(shift.start_time), ceil_hour(shift.end_time)) {
            occupied.insert((shift.role_id, hour), shift);
        }
    }

    let hours: Vec<DateTime<Utc>> = hour_slots(min_hour, max_hour).collect();
    let rows = hours
        .iter()
        .map(|&hour| GridRow {
            hour,
            cells: roles
                .iter()
                .map(|role| match occupied.get(&(role.id, hour)) {
                    None => GridCell::Empty,
                    Some(shift) if floor_hour(shift.start_time) == hour => {
                        let start = floor_hour(shift.start_time);
                        let end = ceil_hour(shift.end_time);
                        GridCell::ShiftStart {
                            shift: ShiftSummary::new(
                                shift,
                                assigned.get(&shift.id).copied().unwrap_or(0),
                            ),
                            rowspan: (end - start).num_hours() as u32,
                            is_signed_up: signed_up.contains(&shift.id),
                        }
                    }
                    Some(_) => GridCell::ShiftContinue,
                })
                .collect(),
        })
        .collect();

    ScheduleGrid { hours, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::at;

    fn role(id: i32, name: &str) -> RoleColumn {
        RoleColumn {
            id,
            name: name.to_string(),
            description: String::new(),
        }
    }

    fn shift(id: i32, role_id: i32, start: DateTime<Utc>, end: DateTime<Utc>) -> shifts::Model {
        shifts::Model {
            id,
            role_id,
            start_time: start,
            end_time: end,
            capacity: 3,
            created_at: start,
            updated_at: start,
        }
    }

    fn rowspan(cell: &GridCell) -> Option<u32> {
        match cell {
            GridCell::ShiftStart { rowspan, .. } => Some(*rowspan),
            _ => None,
        }
    }

    #[test]
    fn test_no_shifts_gives_empty_grid() {
        let grid = build_schedule_grid(&[role(1, "Gate")], &[], &HashMap::new(), &HashSet::new());
        assert_eq!(grid, ScheduleGrid::default());
    }

    #[test]
    fn test_rowspan_and_continuation() {
        let roles = [role(1, "Gate")];
        let shifts = [
            shift(10, 1, at(10, 0), at(12, 0)),
            shift(11, 1, at(12, 30), at(13, 0)),
        ];
        let grid = build_schedule_grid(&roles, &shifts, &HashMap::new(), &HashSet::new());

        assert_eq!(grid.hours, vec![at(10, 0), at(11, 0), at(12, 0)]);
        assert_eq!(rowspan(&grid.rows[0].cells[0]), Some(2));
        assert_eq!(grid.rows[1].cells[0], GridCell::ShiftContinue);
        assert_eq!(rowspan(&grid.rows[2].cells[0]), Some(1));
    }

    #[test]
    fn test_sub_hour_edges_round_outward() {
        let roles = [role(1, "Bar")];
        let shifts = [shift(1, 1, at(9, 30), at(11, 15))];
        let grid = build_schedule_grid(&roles, &shifts, &HashMap::new(), &HashSet::new());

        assert_eq!(grid.hours, vec![at(9, 0), at(10, 0), at(11, 0)]);
        assert_eq!(rowspan(&grid.rows[0].cells[0]), Some(3));
        assert_eq!(grid.rows[2].cells[0], GridCell::ShiftContinue);
    }

    #[test]
    fn test_columns_follow_role_order() {
        let roles = [role(1, "Gate"), role(2, "Bar")];
        let shifts = [shift(5, 2, at(14, 0), at(15, 0)), shift(6, 1, at(15, 0), at(16, 0))];
        let mut assigned = HashMap::new();
        assigned.insert(5, 2);
        let signed_up = HashSet::from([5]);

        let grid = build_schedule_grid(&roles, &shifts, &assigned, &signed_up);

        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0].cells[0], GridCell::Empty);
        match &grid.rows[0].cells[1] {
            GridCell::ShiftStart {
                shift,
                is_signed_up,
                ..
            } => {
                assert_eq!(shift.id, 5);
                assert_eq!(shift.spots_remaining, 1);
                assert!(*is_signed_up);
            }
            other => panic!("expected shift start, got {other:?}"),
        }
        assert_eq!(grid.rows[1].cells[1], GridCell::Empty);
        assert!(matches!(
            grid.rows[1].cells[0],
            GridCell::ShiftStart { is_signed_up: false, .. }
        ));
    }

    #[test]
    fn test_gap_hours_are_empty_rows() {
        let roles = [role(1, "Gate")];
        let shifts = [shift(1, 1, at(8, 0), at(9, 0)), shift(2, 1, at(11, 0), at(12, 0))];
        let grid = build_schedule_grid(&roles, &shifts, &HashMap::new(), &HashSet::new());

        assert_eq!(grid.hours.len(), 4);
        assert_eq!(grid.rows[1].cells[0], GridCell::Empty);
        assert_eq!(grid.rows[2].cells[0], GridCell::Empty);
    }
}
