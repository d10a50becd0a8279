use crate::layout::{Layout, RenderTarget};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub target: RenderTarget,
    pub width: f32,
    pub height: f32,
    pub cell_size: f32,
    pub origin: [f32; 2],
    pub offset_y: f32,
    pub obstacles: Vec<ObstacleDump>,
    /// Occupant id per cell, row-major.
    pub occupancy: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Serialize)]
pub struct ObstacleDump {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label_lines: Vec<String>,
    pub label_font_size: f32,
    pub anchor: Option<[u32; 2]>,
    pub marker: Option<[f32; 3]>,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let mut anchors = vec![None; layout.obstacles.len()];
        let mut occupancy = vec![Vec::new(); layout.geometry.height_cells as usize];
        for cell in &layout.cells {
            if cell.anchor
                && let Some(idx) = cell.occupant
                && let Some(slot) = anchors.get_mut(idx)
            {
                *slot = Some([cell.col, cell.row]);
            }
            if let Some(row) = occupancy.get_mut(cell.row as usize) {
                row.push(cell.occupant.map(|idx| layout.obstacles[idx].id.clone()));
            }
        }

        let obstacles = layout
            .obstacles
            .iter()
            .map(|obstacle| ObstacleDump {
                id: obstacle.id.clone(),
                x: obstacle.rect.left,
                y: obstacle.rect.top,
                width: obstacle.rect.width,
                height: obstacle.rect.height,
                label_lines: obstacle.label.lines.clone(),
                label_font_size: obstacle.label.font_size,
                anchor: anchors[obstacle.index],
                marker: obstacle.marker.map(|m| [m.cx, m.cy, m.r]),
            })
            .collect();

        let origin = layout.geometry.origin;
        LayoutDump {
            target: layout.target,
            width: layout.width,
            height: layout.height,
            cell_size: layout.geometry.cell_size,
            origin: [origin.x, origin.y],
            offset_y: layout.offset_y,
            obstacles,
            occupancy,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
