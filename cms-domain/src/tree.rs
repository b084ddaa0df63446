//! 树变更算法
//!
//! 页面元素与菜单项都是 `Vec<TreeNode>` 形式的有序嵌套树。
//! 节点通过索引路径定位：先以 DFS 前序找出路径，再沿路径取得父集合的可变引用，
//! 于是所有变更都可以表达为对 `(父集合, 下标)` 的原地操作。
//!
use crate::value_object::{Breakpoint, ColumnWidth, Direction};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// 树节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub uuid: Uuid,
    /// 元素/菜单项的类型名
    pub name: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

fn enabled_by_default() -> bool {
    true
}

impl TreeNode {
    pub fn new(uuid: Uuid, name: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            uuid,
            name: name.into(),
            data,
            enabled: true,
            children: Vec::new(),
        }
    }
}

/// 排序提交的嵌套结构，只携带标识
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNode {
    pub uuid: Uuid,
    #[serde(default)]
    pub children: Vec<OrderNode>,
}

impl OrderNode {
    pub fn leaf(uuid: Uuid) -> Self {
        Self {
            uuid,
            children: Vec::new(),
        }
    }
}

/// DFS 前序查找节点的索引路径
pub fn locate(tree: &[TreeNode], uuid: Uuid) -> Option<Vec<usize>> {
    for (i, node) in tree.iter().enumerate() {
        if node.uuid == uuid {
            return Some(vec![i]);
        }
        if let Some(mut path) = locate(&node.children, uuid) {
            path.insert(0, i);
            return Some(path);
        }
    }
    None
}

fn siblings_mut<'a>(tree: &'a mut Vec<TreeNode>, parent_path: &[usize]) -> &'a mut Vec<TreeNode> {
    let mut current = tree;
    for &i in parent_path {
        current = &mut current[i].children;
    }
    current
}

pub fn find(tree: &[TreeNode], uuid: Uuid) -> Option<&TreeNode> {
    for node in tree {
        if node.uuid == uuid {
            return Some(node);
        }
        if let Some(found) = find(&node.children, uuid) {
            return Some(found);
        }
    }
    None
}

pub fn find_mut(tree: &mut Vec<TreeNode>, uuid: Uuid) -> Option<&mut TreeNode> {
    let path = locate(tree, uuid)?;
    let (last, parent) = path.split_last()?;
    siblings_mut(tree, parent).get_mut(*last)
}

pub fn contains(tree: &[TreeNode], uuid: Uuid) -> bool {
    find(tree, uuid).is_some()
}

/// 找到节点后以 `(所在集合, 下标)` 调用 `f`；节点不存在时返回 `None`
pub fn on_node<R>(
    tree: &mut Vec<TreeNode>,
    uuid: Uuid,
    f: impl FnOnce(&mut Vec<TreeNode>, usize) -> R,
) -> Option<R> {
    let path = locate(tree, uuid)?;
    let (last, parent) = path.split_last()?;
    Some(f(siblings_mut(tree, parent), *last))
}

/// 追加到父节点子集合末尾，`parent` 为空时追加到根
pub fn add(tree: &mut Vec<TreeNode>, parent: Option<Uuid>, node: TreeNode) -> bool {
    match parent {
        None => {
            tree.push(node);
            true
        }
        Some(parent) => match find_mut(tree, parent) {
            Some(parent) => {
                parent.children.push(node);
                true
            }
            None => false,
        },
    }
}

pub fn remove(tree: &mut Vec<TreeNode>, uuid: Uuid) -> Option<TreeNode> {
    on_node(tree, uuid, |siblings, i| siblings.remove(i))
}

/// 与相邻兄弟交换位置，已在边界时不变；返回节点是否存在
pub fn shift(tree: &mut Vec<TreeNode>, uuid: Uuid, direction: Direction) -> bool {
    on_node(tree, uuid, |siblings, i| match direction {
        Direction::Up if i > 0 => siblings.swap(i, i - 1),
        Direction::Down if i + 1 < siblings.len() => siblings.swap(i, i + 1),
        _ => {}
    })
    .is_some()
}

/// 副本节点标识：由命令标识与原标识确定性派生
pub fn derive_uuid(command_uuid: Uuid, original: Uuid) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{command_uuid}-{original}").as_bytes(),
    )
}

fn rekey(node: &mut TreeNode, command_uuid: Uuid) {
    node.uuid = derive_uuid(command_uuid, node.uuid);
    for child in &mut node.children {
        rekey(child, command_uuid);
    }
}

/// 深拷贝节点并插入到原节点之后，返回副本根节点标识
pub fn duplicate(tree: &mut Vec<TreeNode>, uuid: Uuid, command_uuid: Uuid) -> Option<Uuid> {
    on_node(tree, uuid, |siblings, i| {
        let mut copy = siblings[i].clone();
        rekey(&mut copy, command_uuid);
        let copied = copy.uuid;
        siblings.insert(i + 1, copy);
        copied
    })
}

/// 复制 `uuid` 子树时将产生的全部新 uuid；节点不存在时为空
pub fn duplicate_uuids(tree: &[TreeNode], uuid: Uuid, command_uuid: Uuid) -> Vec<Uuid> {
    find(tree, uuid)
        .map(|node| {
            uuids(std::slice::from_ref(node))
                .into_iter()
                .map(|original| derive_uuid(command_uuid, original))
                .collect()
        })
        .unwrap_or_default()
}

pub fn set_enabled(tree: &mut Vec<TreeNode>, uuid: Uuid, enabled: bool) -> bool {
    let Some(node) = find_mut(tree, uuid) else {
        return false;
    };
    node.enabled = enabled;
    true
}

/// 替换节点数据
pub fn edit(tree: &mut Vec<TreeNode>, uuid: Uuid, data: Map<String, Value>) -> bool {
    let Some(node) = find_mut(tree, uuid) else {
        return false;
    };
    node.data = data;
    true
}

pub fn resize(
    tree: &mut Vec<TreeNode>,
    uuid: Uuid,
    breakpoint: Breakpoint,
    width: ColumnWidth,
) -> bool {
    let Some(node) = find_mut(tree, uuid) else {
        return false;
    };
    node.data
        .insert(breakpoint.data_key(), Value::from(width.value()));
    true
}

fn flatten(
    nodes: Vec<TreeNode>,
    pool: &mut Vec<Option<TreeNode>>,
    index: &mut HashMap<Uuid, usize>,
) {
    for mut node in nodes {
        let children = std::mem::take(&mut node.children);
        index.insert(node.uuid, pool.len());
        pool.push(Some(node));
        flatten(children, pool, index);
    }
}

fn rebuild(
    order: &[OrderNode],
    pool: &mut [Option<TreeNode>],
    index: &HashMap<Uuid, usize>,
) -> Vec<TreeNode> {
    let mut out = Vec::with_capacity(order.len());
    for entry in order {
        let Some(&i) = index.get(&entry.uuid) else {
            continue;
        };
        // 重复出现的标识只取第一次
        let Some(mut node) = pool[i].take() else {
            continue;
        };
        node.children = rebuild(&entry.children, pool, index);
        out.push(node);
    }
    out
}

/// 按提交的嵌套顺序重建整棵树。
///
/// 未知标识被忽略；树中存在但排序里缺失的节点按原前序追加到根（不带子节点，
/// 其子节点若出现在排序中则各归其位）。
pub fn save_order(tree: &mut Vec<TreeNode>, order: &[OrderNode]) {
    let mut pool = Vec::new();
    let mut index = HashMap::new();
    flatten(std::mem::take(tree), &mut pool, &mut index);

    let mut rebuilt = rebuild(order, &mut pool, &index);
    rebuilt.extend(pool.into_iter().flatten());
    *tree = rebuilt;
}

/// 由树生成对应的排序结构
pub fn flatten_order(tree: &[TreeNode]) -> Vec<OrderNode> {
    tree.iter()
        .map(|node| OrderNode {
            uuid: node.uuid,
            children: flatten_order(&node.children),
        })
        .collect()
}

/// 前序遍历的全部标识
pub fn uuids(tree: &[TreeNode]) -> Vec<Uuid> {
    let mut out = Vec::new();
    collect_uuids(tree, &mut out);
    out
}

fn collect_uuids(tree: &[TreeNode], out: &mut Vec<Uuid>) {
    for node in tree {
        out.push(node.uuid);
        collect_uuids(&node.children, out);
    }
}
