use std::path::PathBuf;
use std::process::ExitCode;
use bevy::prelude::*;
use clap::Parser;
use arm_ik::{ArmConfig, ArmIkPlugin, TargetDriver};


#[derive(Parser)]
#[command(name = "arm_ik", about = "Drives a four segment arm toward a moving target")]
struct Cli {
	/// JSON file with solver conventions and target defaults
	#[arg(long)]
	config: Option<PathBuf>,

	/// Overrides the driver named in the config
	#[arg(long, value_enum)]
	driver: Option<TargetDriver>,
}

/// Ground, lights and camera sized for one arm standing on its pedestal at the origin.
fn setup(
	mut commands: Commands,
	mut meshes: ResMut<Assets<Mesh>>,
	mut materials: ResMut<Assets<StandardMaterial>>,
) {
	const FLOOR_SIZE: f32 = 16.0;

	commands.spawn_bundle(PbrBundle {
		mesh: meshes.add(Mesh::from(shape::Plane { size: FLOOR_SIZE })),
		material: materials.add(StandardMaterial {
			base_color: Color::rgb(0.35, 0.35, 0.4),
			perceptual_roughness: 0.9,
			..Default::default()
		}),
		..Default::default()
	});

	// key light from behind the camera, low enough that the elbow casts onto the floor
	commands.spawn_bundle(DirectionalLightBundle {
		directional_light: DirectionalLight {
			illuminance: 40000.0,
			shadows_enabled: true,
			..Default::default()
		},
		transform: Transform::from_xyz(-6.0, 10.0, 8.0).looking_at(Vec3::new(0.0, 2.0, 0.0), Vec3::Y),
		..Default::default()
	});

	// fill over the arm's reach so the far side of the segments is not black
	commands.spawn_bundle(PointLightBundle {
		point_light: PointLight {
			intensity: 1200.0,
			range: 20.0,
			..Default::default()
		},
		transform: Transform::from_xyz(4.0, 7.0, -4.0),
		..Default::default()
	});

	commands.insert_resource(AmbientLight {
		color: Color::rgb(0.8, 0.85, 1.0),
		brightness: 0.15,
	});

	commands.spawn_bundle(PerspectiveCameraBundle {
		transform: Transform::from_xyz(-12.0, 10.0, 12.0).looking_at(Vec3::new(0.0, 3.0, 0.0), Vec3::Y),
		..Default::default()
	});
}

fn main() -> ExitCode {
	let cli = Cli::parse();

	let mut config = match &cli.config {
		Some(path) => match ArmConfig::load(path) {
			Ok(config) => config,
			Err(err) => {
				eprintln!("arm_ik: {}", err);
				return ExitCode::FAILURE;
			},
		},
		None => ArmConfig::default(),
	};
	if let Some(driver) = cli.driver {
		config.driver = driver;
	}

	App::new()
		.insert_resource(WindowDescriptor {
			title: "Arm IK".to_string(),
			width: 1280.0,
			height: 720.0,
			vsync: false,
			position: Some(Vec2::new(0.0, 0.0)),
			..Default::default()
		})
		.insert_resource(config)
		.add_plugins(DefaultPlugins)
		.insert_resource(ClearColor(Color::rgb(0.08, 0.09, 0.12)))
		.add_startup_system(setup)
		.add_plugin(ArmIkPlugin)
		.run();

	ExitCode::SUCCESS
}
