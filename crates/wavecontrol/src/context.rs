//! Everything the solvers need that stays constant during a run.

use wavecontrol_dec::{Op, SimplicialMesh, INNER_BOUNDARY, OUTER_BOUNDARY};

use crate::{
    boundary::{extract_boundary_edges, extract_source_edges, BoundaryEdgeInfo, SourceEdge},
    ControlParams, Flux, ParamsError, PlaneWave, Pressure,
};

/// Error in setting up a [`StepContext`].
#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    /// The mesh has no stored edge subset with the given name.
    #[error("Mesh has no edge subset named {0:?}")]
    MissingEdgeGroup(&'static str),
    /// An edge on the absorbing boundary doesn't border exactly one triangle.
    #[error("Absorbing boundary edge {edge} borders {faces} triangles instead of one")]
    BoundaryAdjacency {
        /// Index of the offending edge.
        edge: usize,
        /// Number of triangles the edge borders.
        faces: usize,
    },
    /// The parameters were invalid.
    #[error(transparent)]
    Params(#[from] ParamsError),
}

/// Step operators, boundary data and parameters shared by every solver.
///
/// Built once per mesh and parameter set, then borrowed immutably
/// by the forward and backward solvers and the gradient evaluator.
pub struct StepContext<'a> {
    mesh: &'a SimplicialMesh,
    params: ControlParams,
    wave: PlaneWave,
    /// `dt * star_2 * d_1`.
    p_step: Op<Flux, Pressure>,
    /// `dt * star_1⁻¹ * d_1ᵀ`.
    q_step: Op<Pressure, Flux>,
    p_step_t: Op<Pressure, Flux>,
    q_step_t: Op<Flux, Pressure>,
    inner_edges: Vec<SourceEdge>,
    outer_edges: Vec<BoundaryEdgeInfo>,
    steps_per_period: usize,
}

impl<'a> StepContext<'a> {
    /// Build the context for a mesh with the edge subsets
    /// [`INNER_BOUNDARY`] (scatterer surface)
    /// and [`OUTER_BOUNDARY`] (absorbing boundary) stored in it.
    pub fn new(mesh: &'a SimplicialMesh, params: ControlParams) -> Result<Self, SetupError> {
        params.validate()?;

        let inner = mesh
            .get_subset::<1>(INNER_BOUNDARY)
            .ok_or(SetupError::MissingEdgeGroup(INNER_BOUNDARY))?;
        let outer = mesh
            .get_subset::<1>(OUTER_BOUNDARY)
            .ok_or(SetupError::MissingEdgeGroup(OUTER_BOUNDARY))?;
        let outer_edges = extract_boundary_edges(mesh, &outer)?;
        let inner_edges = extract_source_edges(mesh, &inner);

        let dt = params.dt;
        let p_step: Op<Flux, Pressure> = dt * (mesh.star_2() * mesh.d_1());
        let q_step: Op<Pressure, Flux> = dt * (mesh.star_1_inv() * mesh.dual_d_0());
        let p_step_t = p_step.transpose();
        let q_step_t = q_step.transpose();

        let steps_per_period = params.steps_per_period();
        log::info!(
            "Set up {} triangles and {} edges ({} scatterer, {} absorbing), {} steps per period",
            mesh.simplex_count::<2>(),
            mesh.simplex_count::<1>(),
            inner_edges.len(),
            outer_edges.len(),
            steps_per_period,
        );

        Ok(Self {
            mesh,
            params,
            wave: PlaneWave::from_params(&params),
            p_step,
            q_step,
            p_step_t,
            q_step_t,
            inner_edges,
            outer_edges,
            steps_per_period,
        })
    }

    /// The mesh this context was built for.
    #[inline]
    pub fn mesh(&self) -> &'a SimplicialMesh {
        self.mesh
    }

    /// The parameters of the run.
    #[inline]
    pub fn params(&self) -> &ControlParams {
        &self.params
    }

    /// The incoming wave.
    #[inline]
    pub fn wave(&self) -> &PlaneWave {
        &self.wave
    }

    /// Timestep.
    #[inline]
    pub fn dt(&self) -> f64 {
        self.params.dt
    }

    /// Number of steps simulated per wave period.
    #[inline]
    pub fn steps_per_period(&self) -> usize {
        self.steps_per_period
    }

    /// Operator updating pressure from flux.
    #[inline]
    pub fn p_step(&self) -> &Op<Flux, Pressure> {
        &self.p_step
    }

    /// Operator updating flux from pressure.
    #[inline]
    pub fn q_step(&self) -> &Op<Pressure, Flux> {
        &self.q_step
    }

    /// Transpose of [`p_step`][Self::p_step].
    #[inline]
    pub fn p_step_t(&self) -> &Op<Pressure, Flux> {
        &self.p_step_t
    }

    /// Transpose of [`q_step`][Self::q_step].
    #[inline]
    pub fn q_step_t(&self) -> &Op<Flux, Pressure> {
        &self.q_step_t
    }

    /// Edges on the scatterer surface.
    #[inline]
    pub fn inner_edges(&self) -> &[SourceEdge] {
        &self.inner_edges
    }

    /// Edges on the absorbing boundary.
    #[inline]
    pub fn outer_edges(&self) -> &[BoundaryEdgeInfo] {
        &self.outer_edges
    }
}
