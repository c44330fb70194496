//! BoardBuilder - コーディネーターの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 省略された依存はデフォルト（SystemClock / UlidGenerator）で埋める
//! - 設定（BoardConfig）からオプションと初期フィルタを引き継ぐ

use std::sync::Arc;

use crate::config::BoardConfig;
use crate::domain::ListFilter;
use crate::ports::{Clock, IdGenerator, SystemClock, TaskGateway, UlidGenerator};

use super::coordinator::{CoordinatorOptions, MutationCoordinator};

/// BoardBuilder は MutationCoordinator を構築
///
/// # 使用例
/// ```ignore
/// let board = BoardBuilder::new(gateway)
///     .config(&BoardConfig::from_env()?)
///     .build();
/// board.refresh().await?;
/// ```
pub struct BoardBuilder<G> {
    gateway: G,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    options: CoordinatorOptions,
    filter: ListFilter,
}

impl<G: TaskGateway> BoardBuilder<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            clock: None,
            ids: None,
            options: CoordinatorOptions::default(),
            filter: ListFilter::default(),
        }
    }

    /// Clock used for placeholder timestamps (and placeholder ids, unless an id generator is set).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn options(mut self, options: CoordinatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Take options and the initial sort from `config`.
    pub fn config(mut self, config: &BoardConfig) -> Self {
        self.options = CoordinatorOptions::from(config);
        self.filter.sort = config.sort;
        self
    }

    pub fn filter(mut self, filter: ListFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The board starts empty. Call `refresh` to load it.
    pub fn build(self) -> MutationCoordinator<G> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));
        MutationCoordinator::new(self.gateway, clock, ids, self.options, self.filter)
    }
}
