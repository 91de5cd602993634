//! 核心管道模块
//!
//! 责任链式的处理管道：每个阶段接收上下文和后续链 [`Next`]，
//! 可以修改上下文后调用 `next.run(ctx)` 继续，也可以直接返回结果提前终止。
//! 阶段通过 [`PipelineBuilder`] 显式注册，构建时校验顺序约束。

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

/// 管道阶段
#[async_trait]
pub trait Stage<C, E>: Send + Sync
where
    C: Send + 'static,
    E: Send + 'static,
{
    /// 阶段名称，在同一个管道中必须唯一
    fn name(&self) -> &'static str;

    async fn handle(&self, ctx: C, next: Next<'_, C, E>) -> Result<Outcome<C>, E>;
}

/// 管道执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<C> {
    /// 所有阶段都调用了后续链
    Completed(C),
    /// 某个阶段没有调用后续链，提前终止
    Halted(Halt),
}

impl<C> Outcome<C> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

/// 提前终止的原因
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Halt {
    pub stage: &'static str,
    pub reason: String,
}

impl Halt {
    pub fn new(stage: &'static str, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// 后续链
pub struct Next<'a, C, E>
where
    C: Send + 'static,
    E: Send + 'static,
{
    stages: &'a [Box<dyn Stage<C, E>>],
}

impl<'a, C, E> Next<'a, C, E>
where
    C: Send + 'static,
    E: Send + 'static,
{
    /// 执行剩余的阶段；链尾返回 `Outcome::Completed`
    pub async fn run(self, ctx: C) -> Result<Outcome<C>, E> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.handle(ctx, Next { stages: rest }).await,
            None => Ok(Outcome::Completed(ctx)),
        }
    }
}

/// 阶段锚点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    First,
    Normal,
    Last,
}

/// 阶段在管道中的位置声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    anchor: Anchor,
    after: Vec<&'static str>,
    before: Vec<&'static str>,
}

impl Placement {
    pub fn first() -> Self {
        Self::anchored(Anchor::First)
    }

    pub fn normal() -> Self {
        Self::anchored(Anchor::Normal)
    }

    pub fn last() -> Self {
        Self::anchored(Anchor::Last)
    }

    fn anchored(anchor: Anchor) -> Self {
        Self {
            anchor,
            after: Vec::new(),
            before: Vec::new(),
        }
    }

    /// 必须在指定阶段之后执行
    pub fn after(mut self, stage: &'static str) -> Self {
        self.after.push(stage);
        self
    }

    /// 必须在指定阶段之前执行
    pub fn before(mut self, stage: &'static str) -> Self {
        self.before.push(stage);
        self
    }
}

/// 管道构建错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineBuildError {
    #[error("阶段名称重复: {0}")]
    DuplicateStage(&'static str),
    #[error("阶段 {first} 和 {second} 都声明为第一个执行")]
    MultipleFirst {
        first: &'static str,
        second: &'static str,
    },
    #[error("阶段 {first} 和 {second} 都声明为最后执行")]
    MultipleLast {
        first: &'static str,
        second: &'static str,
    },
    #[error("阶段 {stage} 引用了未注册的阶段 {reference}")]
    UnknownStage {
        stage: &'static str,
        reference: &'static str,
    },
    #[error("阶段顺序存在循环: {0:?}")]
    Cycle(Vec<&'static str>),
}

struct Registration<C, E>
where
    C: Send + 'static,
    E: Send + 'static,
{
    stage: Box<dyn Stage<C, E>>,
    placement: Placement,
}

/// 管道构建器
pub struct PipelineBuilder<C, E>
where
    C: Send + 'static,
    E: Send + 'static,
{
    registrations: Vec<Registration<C, E>>,
}

impl<C, E> Default for PipelineBuilder<C, E>
where
    C: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }
}

impl<C, E> PipelineBuilder<C, E>
where
    C: Send + 'static,
    E: Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S>(mut self, stage: S, placement: Placement) -> Self
    where
        S: Stage<C, E> + 'static,
    {
        self.registrations.push(Registration {
            stage: Box::new(stage),
            placement,
        });
        self
    }

    /// 按顺序约束排列阶段；同等条件下保持注册顺序
    pub fn build(self) -> Result<Pipeline<C, E>, PipelineBuildError> {
        let order = resolve_order(&self.registrations)?;

        let mut slots: Vec<Option<Box<dyn Stage<C, E>>>> = self
            .registrations
            .into_iter()
            .map(|registration| Some(registration.stage))
            .collect();

        let stages = order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();

        Ok(Pipeline { stages })
    }
}

fn resolve_order<C, E>(
    registrations: &[Registration<C, E>],
) -> Result<Vec<usize>, PipelineBuildError>
where
    C: Send + 'static,
    E: Send + 'static,
{
    let names: Vec<&'static str> = registrations.iter().map(|r| r.stage.name()).collect();

    let mut index_of = HashMap::with_capacity(names.len());
    for (index, name) in names.iter().enumerate() {
        if index_of.insert(*name, index).is_some() {
            return Err(PipelineBuildError::DuplicateStage(*name));
        }
    }

    let mut first = None;
    let mut last = None;
    for (index, registration) in registrations.iter().enumerate() {
        match registration.placement.anchor {
            Anchor::First => {
                if let Some(previous) = first.replace(index) {
                    return Err(PipelineBuildError::MultipleFirst {
                        first: names[previous],
                        second: names[index],
                    });
                }
            }
            Anchor::Last => {
                if let Some(previous) = last.replace(index) {
                    return Err(PipelineBuildError::MultipleLast {
                        first: names[previous],
                        second: names[index],
                    });
                }
            }
            Anchor::Normal => {}
        }
    }

    // edges[a] 包含 b 表示 a 必须在 b 之前
    let mut edges: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); names.len()];
    for (index, registration) in registrations.iter().enumerate() {
        let lookup = |reference: &'static str| {
            index_of
                .get(reference)
                .copied()
                .ok_or(PipelineBuildError::UnknownStage {
                    stage: names[index],
                    reference,
                })
        };

        for reference in &registration.placement.after {
            let other = lookup(*reference)?;
            edges[other].insert(index);
        }
        for reference in &registration.placement.before {
            let other = lookup(*reference)?;
            edges[index].insert(other);
        }
    }

    for other in 0..names.len() {
        if let Some(head) = first {
            if other != head {
                edges[head].insert(other);
            }
        }
        if let Some(tail) = last {
            if other != tail {
                edges[other].insert(tail);
            }
        }
    }

    let mut in_degree = vec![0usize; names.len()];
    for targets in &edges {
        for &target in targets {
            in_degree[target] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..names.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(names.len());

    while let Some(index) = ready.pop_first() {
        order.push(index);
        for &target in &edges[index] {
            in_degree[target] -= 1;
            if in_degree[target] == 0 {
                ready.insert(target);
            }
        }
    }

    if order.len() != names.len() {
        let stuck = (0..names.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| names[i])
            .collect();
        return Err(PipelineBuildError::Cycle(stuck));
    }

    Ok(order)
}

/// 已构建的管道
pub struct Pipeline<C, E>
where
    C: Send + 'static,
    E: Send + 'static,
{
    stages: Vec<Box<dyn Stage<C, E>>>,
}

impl<C, E> Pipeline<C, E>
where
    C: Send + 'static,
    E: Send + 'static,
{
    pub fn builder() -> PipelineBuilder<C, E> {
        PipelineBuilder::new()
    }

    pub async fn run(&self, ctx: C) -> Result<Outcome<C>, E> {
        Next {
            stages: &self.stages,
        }
        .run(ctx)
        .await
    }

    /// 按执行顺序返回阶段名称
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<C, E> fmt::Debug for Pipeline<C, E>
where
    C: Send + 'static,
    E: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}
