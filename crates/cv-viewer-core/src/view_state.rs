//! Toggle state owned by the page: measurement tool, legend, sidebar.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementTool {
    Distance,
    Area,
}

impl MeasurementTool {
    pub fn unit(self) -> &'static str {
        match self {
            MeasurementTool::Distance => "feet",
            MeasurementTool::Area => "square-us-feet",
        }
    }

    pub fn button_id(self) -> &'static str {
        match self {
            MeasurementTool::Distance => "distanceButton",
            MeasurementTool::Area => "areaButton",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementChange {
    pub removed: Option<MeasurementTool>,
    pub activated: Option<MeasurementTool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarLayout {
    pub width_px: u32,
    pub view_padding_left: u32,
}

pub const SIDEBAR_WIDTH_PX: u32 = 300;

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    active_tool: Option<MeasurementTool>,
    legend_visible: bool,
    sidebar_collapsed: bool,
}

impl ViewState {
    pub fn active_tool(&self) -> Option<MeasurementTool> {
        self.active_tool
    }

    pub fn legend_visible(&self) -> bool {
        self.legend_visible
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.sidebar_collapsed
    }

    /// A measurement button was clicked. Any active tool is torn down; the
    /// clicked tool starts unless it was the one already running.
    pub fn toggle_measurement(&mut self, tool: MeasurementTool) -> MeasurementChange {
        let removed = self.active_tool.take();
        let activated = (removed != Some(tool)).then_some(tool);
        self.active_tool = activated;
        MeasurementChange { removed, activated }
    }

    /// Returns whether the legend is now shown.
    pub fn toggle_legend(&mut self) -> bool {
        self.legend_visible = !self.legend_visible;
        self.legend_visible
    }

    pub fn toggle_sidebar(&mut self) -> SidebarLayout {
        self.sidebar_collapsed = !self.sidebar_collapsed;
        self.sidebar_layout()
    }

    pub fn sidebar_layout(&self) -> SidebarLayout {
        let width = if self.sidebar_collapsed { 0 } else { SIDEBAR_WIDTH_PX };
        SidebarLayout {
            width_px: width,
            view_padding_left: width,
        }
    }
}
