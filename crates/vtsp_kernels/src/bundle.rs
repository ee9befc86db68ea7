use vtsp_core::{
    depend::{
        Dependencies, Drawer, LogLogger, LogReporter, NoopDrawer, PathIntegral, SplitPredicate,
    },
    options::{IntegralKind, SolverOptions},
};

use crate::{
    delaunay::DelaunayMesher,
    drawer::PngDrawer,
    envelope::MonotoneChainEnvelope,
    heat::FemHeatSolver,
    integral::{GeodesicIntegral, SegmentIntegral},
    predicates::{MaxAreaSplit, NeverSplit},
};

enum Integral {
    Segment(SegmentIntegral),
    Geodesic(GeodesicIntegral),
}

enum Split {
    Never(NeverSplit),
    MaxArea(MaxAreaSplit),
}

/// One owned instance of every collaborator a solve needs.
pub struct Kernels {
    logger: LogLogger,
    reporter: LogReporter,
    drawer: Option<PngDrawer>,
    envelope: MonotoneChainEnvelope,
    mesher: DelaunayMesher,
    heat: FemHeatSolver,
    integral: Integral,
    split: Split,
}

impl Kernels {
    pub fn from_options(options: &SolverOptions) -> Self {
        let integral = match options.integral {
            IntegralKind::Segment => Integral::Segment(SegmentIntegral {
                field_weight: options.field_weight,
            }),
            IntegralKind::Geodesic => Integral::Geodesic(GeodesicIntegral {
                field_weight: options.field_weight,
            }),
        };

        Self {
            logger: LogLogger,
            reporter: LogReporter::default(),
            drawer: options
                .draw_dir_path()
                .map(|dir| PngDrawer::new(dir, options.draw_width, options.draw_height)),
            envelope: MonotoneChainEnvelope,
            mesher: DelaunayMesher,
            heat: FemHeatSolver {
                diffusion: options.diffusion,
                source: options.heat_source,
                tolerance: options.cg_tolerance,
                max_iterations: options.cg_max_iterations,
            },
            integral,
            split: match options.max_triangle_area {
                Some(area) => Split::MaxArea(MaxAreaSplit(area)),
                None => Split::Never(NeverSplit),
            },
        }
    }

    pub fn dependencies(&self) -> Dependencies<'_> {
        let drawer: &dyn Drawer = match &self.drawer {
            Some(png) => png,
            None => &NoopDrawer,
        };
        let integral: &dyn PathIntegral = match &self.integral {
            Integral::Segment(segment) => segment,
            Integral::Geodesic(geodesic) => geodesic,
        };
        let split: &dyn SplitPredicate = match &self.split {
            Split::Never(never) => never,
            Split::MaxArea(max_area) => max_area,
        };

        Dependencies {
            logger: &self.logger,
            reporter: &self.reporter,
            drawer,
            envelope: &self.envelope,
            mesher: &self.mesher,
            heat: &self.heat,
            integral,
            split: Some(split),
        }
    }
}

impl Default for Kernels {
    fn default() -> Self {
        Self::from_options(&SolverOptions::default())
    }
}
