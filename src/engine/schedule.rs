// ==========================================
// 取件账户分配系统 - 时段排程
// ==========================================
// 步骤:
//   1. 选定统一步长与结束边界 (逐级升级)
//      全天 + 最大步长 → 第一收缩点 + 最大步长 → 第一收缩点 + 动态步长
//      → 第二收缩点 + 最大步长 → 第二收缩点 + 动态步长 → 不可行
//   2. 生成时间格 (丢弃越过 end - step 的末格)
//   3. 组织按均匀目标时刻占格 (目标时刻之后首个空格)
//   4. 组织内按文章轮转将结果行绑定到该组织的格
// 红线: 一个格最多一个任务; 步长不低于最小步长
// 时间统一以毫秒整数计算, 避免浮点误差
// ==========================================

use crate::domain::plan::ResultRow;
use crate::domain::server::ScheduleConfig;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, instrument};

const MS_PER_MINUTE: f64 = 60_000.0;
const MS_PER_SECOND: i64 = 1_000;

/// 步骤1选中的策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStrategy {
    FullDayMaxStep,
    FirstPointMaxStep,
    FirstPointDynamic,
    SecondPointMaxStep,
    SecondPointDynamic,
}

impl fmt::Display for StepStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStrategy::FullDayMaxStep => "FULL_DAY_MAX_STEP",
            StepStrategy::FirstPointMaxStep => "FIRST_POINT_MAX_STEP",
            StepStrategy::FirstPointDynamic => "FIRST_POINT_DYNAMIC",
            StepStrategy::SecondPointMaxStep => "SECOND_POINT_MAX_STEP",
            StepStrategy::SecondPointDynamic => "SECOND_POINT_DYNAMIC",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleCell {
    pub at: NaiveDateTime,
    pub org_id: Option<i64>,
    offset_ms: i64,
}

// ==========================================
// ScheduleGrid - 当日时间格
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleGrid {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub step: Duration,
    pub strategy: StepStrategy,
    pub cells: Vec<ScheduleCell>,
}

impl ScheduleGrid {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn window(&self) -> Duration {
        self.end - self.start
    }

    /// 组织占用的格 (时间顺序)
    pub fn cells_of(&self, org_id: i64) -> impl Iterator<Item = &ScheduleCell> {
        self.cells.iter().filter(move |c| c.org_id == Some(org_id))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScheduleBuilder;

impl ScheduleBuilder {
    pub fn new() -> Self {
        Self
    }

    /// 步骤 1 + 2: 选定步长并生成时间格
    ///
    /// # 错误
    /// - InvalidScheduleConfig: 步长配置非法
    /// - ScheduleInfeasible: 所有策略均无法容纳任务数
    #[instrument(skip(self, config), fields(schedule = %config.title))]
    pub fn build(
        &self,
        config: &ScheduleConfig,
        date: NaiveDate,
        task_count: usize,
    ) -> EngineResult<ScheduleGrid> {
        let max_ms = minutes_to_ms(config.time_max_min_per_step);
        let min_ms = minutes_to_ms(config.time_min_min_per_step);
        if max_ms <= 0 || min_ms <= 0 || min_ms > max_ms {
            return Err(EngineError::InvalidScheduleConfig(format!(
                "step bounds min={} max={} minutes",
                config.time_min_min_per_step, config.time_max_min_per_step
            )));
        }

        let start = date.and_time(config.time_start);
        let offset_of = |t: NaiveTime| (date.and_time(t) - start).num_milliseconds();
        let n = task_count as i64;

        // === 步骤 1 ===
        let mut strategy = StepStrategy::FullDayMaxStep;
        let mut step_ms = max_ms;
        let mut end_ms = offset_of(config.time_end);
        let mut cells = count_cells(end_ms, step_ms);

        if cells < n {
            strategy = StepStrategy::FirstPointMaxStep;
            end_ms = offset_of(config.time_first_point);
            cells = count_cells(end_ms, step_ms);

            if cells < n {
                strategy = StepStrategy::FirstPointDynamic;
                step_ms = dynamic_step(cells, n, max_ms);

                if step_ms < min_ms {
                    strategy = StepStrategy::SecondPointMaxStep;
                    step_ms = max_ms;
                    end_ms = offset_of(config.time_second_point);
                    cells = count_cells(end_ms, step_ms);

                    if cells < n {
                        strategy = StepStrategy::SecondPointDynamic;
                        step_ms = dynamic_step(cells, n, max_ms);

                        if step_ms < min_ms {
                            return Err(EngineError::ScheduleInfeasible(format!(
                                "{} tasks need more than {} cells at min step {} minutes",
                                task_count, cells, config.time_min_min_per_step
                            )));
                        }
                    }
                }
            }
        }

        // === 步骤 2 ===
        let mut offsets = Vec::new();
        let mut t = 0;
        while t < end_ms {
            offsets.push(t);
            t += step_ms;
        }
        if offsets.last().is_some_and(|&last| last > end_ms - step_ms) {
            offsets.pop();
        }

        let cells: Vec<ScheduleCell> = offsets
            .into_iter()
            .map(|offset_ms| ScheduleCell {
                at: start + Duration::milliseconds(offset_ms),
                org_id: None,
                offset_ms,
            })
            .collect();

        debug!(
            strategy = %strategy,
            step_ms,
            cells = cells.len(),
            task_count,
            "时间格生成"
        );

        Ok(ScheduleGrid {
            start,
            end: start + Duration::milliseconds(end_ms),
            step: Duration::milliseconds(step_ms),
            strategy,
            cells,
        })
    }

    /// 步骤 3: 组织占格
    ///
    /// # 参数
    /// - demands: (org_id, 任务数), 按处理顺序
    ///
    /// # 返回
    /// - 每个组织实际占到的格数
    pub fn assign_organizations(
        &self,
        grid: &mut ScheduleGrid,
        demands: &[(i64, usize)],
    ) -> Vec<(i64, usize)> {
        let window_ms = (grid.end - grid.start).num_milliseconds();
        let mut assigned = Vec::with_capacity(demands.len());

        for &(org_id, amount) in demands {
            let n = amount as i64;
            let mut got = 0;
            for x in 0..n {
                // cell.offset >= x * window / n
                let target = x * window_ms;
                let cell = grid
                    .cells
                    .iter_mut()
                    .find(|c| c.org_id.is_none() && c.offset_ms * n >= target);
                if let Some(cell) = cell {
                    cell.org_id = Some(org_id);
                    got += 1;
                }
            }
            assigned.push((org_id, got));
        }

        assigned
    }

    /// 步骤 4: 结果行绑定到组织的格
    ///
    /// 每个组织内按文章首次出现顺序轮转; 找到行即占用该行 (即便组织无空格)
    pub fn bind_rows(&self, grid: &ScheduleGrid, rows: &mut [ResultRow], org_order: &[i64]) {
        let mut used_rows: HashSet<usize> = HashSet::new();
        let mut used_cells: HashSet<usize> = HashSet::new();

        for &org_id in org_order {
            let mut articles: Vec<(String, usize)> = Vec::new();
            for row in rows.iter().filter(|r| r.org_id == org_id) {
                match articles.iter_mut().find(|(a, _)| *a == row.article) {
                    Some((_, n)) => *n += 1,
                    None => articles.push((row.article.clone(), 1)),
                }
            }
            let rounds = articles.iter().map(|(_, n)| *n).max().unwrap_or(0);

            for _ in 0..rounds {
                for (article, remaining) in articles.iter_mut() {
                    if *remaining == 0 {
                        continue;
                    }
                    let row_idx = rows.iter().enumerate().position(|(i, r)| {
                        r.org_id == org_id && r.article == *article && !used_rows.contains(&i)
                    });
                    if let Some(row_idx) = row_idx {
                        let cell_idx = grid.cells.iter().enumerate().position(|(i, c)| {
                            c.org_id == Some(org_id) && !used_cells.contains(&i)
                        });
                        if let Some(cell_idx) = cell_idx {
                            used_cells.insert(cell_idx);
                            rows[row_idx].scheduled_at = Some(grid.cells[cell_idx].at);
                        }
                        used_rows.insert(row_idx);
                    }
                    *remaining -= 1;
                }
            }
        }
    }
}

fn minutes_to_ms(minutes: f64) -> i64 {
    (minutes * MS_PER_MINUTE).round() as i64
}

fn count_cells(window_ms: i64, step_ms: i64) -> i64 {
    if window_ms <= 0 {
        0
    } else {
        window_ms / step_ms
    }
}

/// 动态步长 = cells / n × max_step, 截断到整秒
fn dynamic_step(cells: i64, n: i64, max_ms: i64) -> i64 {
    if n == 0 {
        return max_ms;
    }
    cells * max_ms / (n * MS_PER_SECOND) * MS_PER_SECOND
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn create_test_schedule(end: NaiveTime, first: NaiveTime, second: NaiveTime) -> ScheduleConfig {
        ScheduleConfig {
            title: "S".to_string(),
            time_min_min_per_step: 2.0,
            time_max_min_per_step: 10.0,
            time_start: hm(9, 0),
            time_end: end,
            time_first_point: first,
            time_second_point: second,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
    }

    fn create_test_row(row_no: usize, org_id: i64, article: &str) -> ResultRow {
        ResultRow {
            row_no,
            task_id: row_no as i64,
            org_id,
            org_title: format!("ORG{}", org_id),
            article: article.to_string(),
            size: None,
            keyword: None,
            price: None,
            account_id: None,
            account_number: None,
            address_id: None,
            address: None,
            scheduled_at: None,
        }
    }

    #[test]
    fn test_dynamic_step_truncates_to_seconds() {
        // 48 × 600s / 50 = 576s
        assert_eq!(dynamic_step(48, 50, 600_000), 576_000);
        // 7 × 600s / 9 = 466.67s → 466s
        assert_eq!(dynamic_step(7, 9, 600_000), 466_000);
    }

    #[test]
    fn test_grid_drops_partial_trailing_cell() {
        let config = ScheduleConfig {
            time_end: NaiveTime::from_hms_opt(9, 25, 0).unwrap(),
            ..create_test_schedule(hm(9, 25), hm(9, 25), hm(9, 25))
        };
        let grid = ScheduleBuilder::new().build(&config, date(), 2).unwrap();
        // 0, 10, 20 → 20 > 25 - 10, 丢弃
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_assign_organizations_spreads_targets() {
        let config = create_test_schedule(hm(10, 0), hm(10, 0), hm(10, 0));
        let builder = ScheduleBuilder::new();
        let mut grid = builder.build(&config, date(), 6).unwrap();
        assert_eq!(grid.len(), 6);

        let assigned = builder.assign_organizations(&mut grid, &[(1, 3), (2, 3)]);
        assert_eq!(assigned, vec![(1, 3), (2, 3)]);

        let org1: Vec<NaiveDateTime> = grid.cells_of(1).map(|c| c.at).collect();
        assert_eq!(
            org1,
            vec![
                date().and_time(hm(9, 0)),
                date().and_time(hm(9, 20)),
                date().and_time(hm(9, 40)),
            ]
        );
        let org2: Vec<NaiveDateTime> = grid.cells_of(2).map(|c| c.at).collect();
        assert_eq!(
            org2,
            vec![
                date().and_time(hm(9, 10)),
                date().and_time(hm(9, 30)),
                date().and_time(hm(9, 50)),
            ]
        );
    }

    #[test]
    fn test_bind_rows_round_robin_by_article() {
        let config = create_test_schedule(hm(10, 0), hm(10, 0), hm(10, 0));
        let builder = ScheduleBuilder::new();
        let mut grid = builder.build(&config, date(), 3).unwrap();
        builder.assign_organizations(&mut grid, &[(1, 3)]);

        let mut rows = vec![
            create_test_row(1, 1, "A"),
            create_test_row(2, 1, "A"),
            create_test_row(3, 1, "B"),
        ];
        builder.bind_rows(&grid, &mut rows, &[1]);

        let cells: Vec<NaiveDateTime> = grid.cells_of(1).map(|c| c.at).collect();
        // 第一轮: A → 格0, B → 格1; 第二轮: A → 格2
        assert_eq!(rows[0].scheduled_at, Some(cells[0]));
        assert_eq!(rows[2].scheduled_at, Some(cells[1]));
        assert_eq!(rows[1].scheduled_at, Some(cells[2]));
    }

    #[test]
    fn test_invalid_step_bounds() {
        let config = ScheduleConfig {
            time_min_min_per_step: 12.0,
            ..create_test_schedule(hm(17, 0), hm(18, 0), hm(19, 0))
        };
        let err = ScheduleBuilder::new().build(&config, date(), 10).unwrap_err();
        assert!(matches!(err, EngineError::InvalidScheduleConfig(_)));
    }
}
