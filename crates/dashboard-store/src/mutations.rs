use dashboard_protocol::backend::WidgetOrderItem;
use dashboard_protocol::model::{Widget, WidgetConfig};

pub const DEFAULT_GRID_COLUMNS: u32 = 12;

/// Layout for a duplicated widget: one column right and one row down,
/// with the column clamped to the grid.
pub fn duplicate_config(source: &WidgetConfig, grid_columns: u32) -> WidgetConfig {
    let max_x = grid_columns.saturating_sub(1);
    let mut config = source.clone();
    config.x = source.x.saturating_add(1).min(max_x);
    config.y = source.y.saturating_add(1);
    config
}

/// Recomputed widget list for a drag-and-drop move. Indices address the
/// list sorted by `order`. Returns `None` when the move is a no-op
/// (equal or out-of-range indices). The result carries a dense 0-based
/// `order` sequence and no grouping keys.
pub fn plan_reorder(
    widgets: &[Widget],
    previous_index: usize,
    current_index: usize,
) -> Option<Vec<Widget>> {
    if previous_index == current_index {
        return None;
    }
    if previous_index >= widgets.len() || current_index >= widgets.len() {
        return None;
    }

    let mut ordered = widgets.to_vec();
    ordered.sort_by_key(|widget| widget.config.order);
    let moved = ordered.remove(previous_index);
    ordered.insert(current_index, moved);

    for (index, widget) in ordered.iter_mut().enumerate() {
        widget.config.order = index as u32;
        widget.config.group = None;
    }

    Some(ordered)
}

pub fn order_items(widgets: &[Widget]) -> Vec<WidgetOrderItem> {
    widgets
        .iter()
        .map(|widget| WidgetOrderItem {
            id: widget.id.clone(),
            order: widget.config.order,
            group: widget.config.group.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::test_support::widget;

    use super::{duplicate_config, order_items, plan_reorder, DEFAULT_GRID_COLUMNS};

    #[test]
    fn duplicate_offsets_one_column_and_one_row() {
        let source = widget("d-1", "w-1", 0);
        let config = duplicate_config(&source.config, DEFAULT_GRID_COLUMNS);

        assert_eq!(config.x, source.config.x + 1);
        assert_eq!(config.y, source.config.y + 1);
    }

    #[test]
    fn duplicate_clamps_column_to_grid_edge() {
        let mut source = widget("d-1", "w-1", 0);
        source.config.x = 11;
        source.config.y = 4;

        let config = duplicate_config(&source.config, DEFAULT_GRID_COLUMNS);

        assert_eq!(config.x, 11);
        assert_eq!(config.y, 5);
    }

    #[test]
    fn duplicate_tolerates_extreme_layout_values() {
        let mut source = widget("d-1", "w-1", 0);
        source.config.x = u32::MAX;
        source.config.y = u32::MAX;

        let config = duplicate_config(&source.config, DEFAULT_GRID_COLUMNS);

        assert_eq!(config.x, DEFAULT_GRID_COLUMNS - 1);
        assert_eq!(config.y, u32::MAX);
    }

    #[test]
    fn reorder_moves_element_and_reassigns_dense_orders() {
        let widgets = vec![
            widget("d-1", "a", 0),
            widget("d-1", "b", 1),
            widget("d-1", "c", 2),
        ];

        let reordered = plan_reorder(&widgets, 0, 2).expect("move produces a plan");

        let ids: Vec<&str> = reordered.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        let orders: Vec<u32> = reordered.iter().map(|w| w.config.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn reorder_sorts_by_order_before_indexing() {
        // Stored out of order; indices address the sorted view.
        let widgets = vec![
            widget("d-1", "c", 2),
            widget("d-1", "a", 0),
            widget("d-1", "b", 1),
        ];

        let reordered = plan_reorder(&widgets, 2, 0).expect("move produces a plan");

        let ids: Vec<&str> = reordered.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn reorder_strips_grouping_keys() {
        let mut widgets = vec![widget("d-1", "a", 0), widget("d-1", "b", 1)];
        widgets[0].config.group = Some("left".to_owned());
        widgets[1].config.group = Some("right".to_owned());

        let reordered = plan_reorder(&widgets, 0, 1).expect("move produces a plan");

        assert!(reordered.iter().all(|w| w.config.group.is_none()));
    }

    #[test]
    fn reorder_is_a_no_op_for_equal_or_out_of_range_indices() {
        let widgets = vec![widget("d-1", "a", 0), widget("d-1", "b", 1)];

        assert!(plan_reorder(&widgets, 1, 1).is_none());
        assert!(plan_reorder(&widgets, 2, 0).is_none());
        assert!(plan_reorder(&widgets, 0, 2).is_none());
    }

    #[test]
    fn order_items_mirror_the_planned_sequence() {
        let widgets = vec![
            widget("d-1", "a", 0),
            widget("d-1", "b", 1),
            widget("d-1", "c", 2),
        ];
        let reordered = plan_reorder(&widgets, 0, 2).expect("move produces a plan");

        let items = order_items(&reordered);

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id.as_str(), "b");
        assert_eq!(items[0].order, 0);
        assert_eq!(items[2].id.as_str(), "a");
        assert_eq!(items[2].order, 2);
        assert!(items.iter().all(|item| item.group.is_none()));
    }
}
